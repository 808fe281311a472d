//! EduHive Engine - administrative command line

use std::sync::Arc;

use chrono::SecondsFormat;
use clap::{CommandFactory, Parser};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduhive_engine::{
    Caller,
    config::{Args, Command, LogFormat, StoreBackend},
    db::{schemas::UserProfile, DocumentStore, InMemoryStore, MongoClient, MongoStore},
    seed,
    services::{spawn_logging_listener, Engine, LeaderboardEntry},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Logs go to stderr; stdout carries command output
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("eduhive_engine={},info", args.log_level).into());
    let json_logs = args.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let Some(command) = args.command.clone() else {
        Args::command().print_help()?;
        return Ok(());
    };

    let store: Arc<dyn DocumentStore> = match args.store {
        StoreBackend::Mongo => {
            let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
            Arc::new(MongoStore::connect(&mongo).await?)
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, nothing will be persisted");
            Arc::new(InMemoryStore::new())
        }
    };

    let engine = Engine::new(store, args.engine_options());
    let listener = spawn_logging_listener(&engine.events);

    let output = run(&engine, command, args.leaderboard_limit).await;

    // Closing the bus lets the listener drain and exit
    drop(engine);
    let _ = listener.await;

    let output = output?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(
    engine: &Engine,
    command: Command,
    default_limit: usize,
) -> anyhow::Result<serde_json::Value> {
    let value = match command {
        Command::SeedPaths => {
            serde_json::to_value(seed::seed_learning_paths(engine.store.as_ref()).await?)?
        }
        Command::Leaderboard { limit } => {
            let entries = engine
                .leaderboard
                .ranked(limit.unwrap_or(default_limit))
                .await?;
            json!(entries.iter().map(render_entry).collect::<Vec<_>>())
        }
        Command::Profile { email } => match engine.points.profile(&email).await? {
            Some(profile) => render_profile(&profile),
            None => json!({ "email": email, "points": 0, "level": 1 }),
        },
        Command::Enroll { email, path } => {
            let caller = Caller::new(&email);
            serde_json::to_value(engine.progress.enroll(&caller, &email, &path).await?)?
        }
        Command::Complete { email, article } => {
            let caller = Caller::new(&email);
            serde_json::to_value(
                engine
                    .progress
                    .complete_article(&caller, &email, &article)
                    .await?,
            )?
        }
        Command::Progress { email, path } => {
            let caller = Caller::new(&email);
            match path {
                Some(path) => serde_json::to_value(
                    engine.progress.path_progress(&caller, &email, &path).await?,
                )?,
                None => serde_json::to_value(
                    engine.progress.all_path_progress(&caller, &email).await?,
                )?,
            }
        }
        Command::Next { email, path } => {
            let caller = Caller::new(&email);
            serde_json::to_value(
                engine
                    .progress
                    .next_recommended(&caller, &email, &path)
                    .await?,
            )?
        }
        Command::Paths => {
            let paths = engine.content.list_learning_paths().await?;
            json!(paths
                .iter()
                .map(|p| json!({
                    "id": p.id,
                    "title": p.title,
                    "difficulty": p.difficulty,
                    "estimatedHours": p.estimated_hours,
                    "articleSequence": p.article_sequence,
                }))
                .collect::<Vec<_>>())
        }
    };
    Ok(value)
}

fn render_entry(entry: &LeaderboardEntry) -> serde_json::Value {
    json!({
        "rank": entry.rank,
        "email": entry.email,
        "points": entry.points,
        "level": entry.level,
        "lastActivity": entry.last_activity.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

fn render_profile(profile: &UserProfile) -> serde_json::Value {
    json!({
        "email": profile.email,
        "points": profile.points,
        "level": profile.level,
        "badges": profile.badges,
        "lastActivity": profile.last_activity.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true),
        "activities": profile
            .activities
            .iter()
            .map(|a| json!({
                "type": a.action,
                "points": a.points,
                "timestamp": a.timestamp.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true),
            }))
            .collect::<Vec<_>>(),
    })
}
