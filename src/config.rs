//! Configuration for the engine
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand, ValueEnum};

use crate::services::{CompletionAwards, EngineOptions, DEFAULT_LIMIT};

/// EduHive learning progress and gamification engine
#[derive(Parser, Debug, Clone)]
#[command(name = "eduhive-engine")]
#[command(about = "Learning progress and gamification engine for EduHive")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "eduHive")]
    pub mongodb_db: String,

    /// Document store backend
    #[arg(long, env = "STORE", value_enum, default_value_t = StoreBackend::Mongo)]
    pub store: StoreBackend,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Whether repeated completions of the same article award points again
    #[arg(long, env = "COMPLETION_AWARDS", value_enum, default_value_t = CompletionAwards::EveryCall)]
    pub completion_awards: CompletionAwards,

    /// Default number of leaderboard rows
    #[arg(long, env = "LEADERBOARD_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub leaderboard_limit: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Mongo,
    /// Process-local store, nothing is persisted
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the sample learning paths from the first articles
    SeedPaths,
    /// Show the top users by points
    Leaderboard {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a user's gamification profile
    Profile {
        #[arg(long)]
        email: String,
    },
    /// Enroll a user in a learning path
    Enroll {
        #[arg(long)]
        email: String,
        #[arg(long)]
        path: String,
    },
    /// Mark an article completed
    Complete {
        #[arg(long)]
        email: String,
        #[arg(long)]
        article: String,
    },
    /// Show path progress; every enrolled path when --path is omitted
    Progress {
        #[arg(long)]
        email: String,
        #[arg(long)]
        path: Option<String>,
    },
    /// Show the next recommended article of a path
    Next {
        #[arg(long)]
        email: String,
        #[arg(long)]
        path: String,
    },
    /// List learning paths
    Paths,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.store == StoreBackend::Mongo {
            if self.mongodb_db.trim().is_empty() {
                return Err("MONGODB_DB must not be empty".to_string());
            }
            if !self.mongodb_uri.starts_with("mongodb://")
                && !self.mongodb_uri.starts_with("mongodb+srv://")
            {
                return Err(
                    "MONGODB_URI must start with mongodb:// or mongodb+srv://".to_string(),
                );
            }
        }

        if self.leaderboard_limit == 0 {
            return Err("LEADERBOARD_LIMIT must be greater than zero".to_string());
        }

        if let Some(Command::Leaderboard { limit: Some(0) }) = self.command {
            return Err("--limit must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            completion_awards: self.completion_awards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["eduhive-engine"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let args = parse(&["paths"]);
        assert_eq!(args.mongodb_db, "eduHive");
        assert_eq!(args.leaderboard_limit, DEFAULT_LIMIT);
        assert_eq!(args.completion_awards, CompletionAwards::EveryCall);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_subcommand_arguments() {
        let args = parse(&[
            "--completion-awards",
            "first-only",
            "enroll",
            "--email",
            "ana@x.com",
            "--path",
            "p1",
        ]);
        assert_eq!(
            args.command,
            Some(Command::Enroll {
                email: "ana@x.com".into(),
                path: "p1".into()
            })
        );
        assert_eq!(
            args.engine_options().completion_awards,
            CompletionAwards::FirstOnly
        );
    }

    #[test]
    fn test_rejects_bad_uri() {
        let args = parse(&["--mongodb-uri", "http://localhost:27017"]);
        assert!(args.validate().is_err());

        // Memory store never connects
        let args = parse(&["--store", "memory", "--mongodb-uri", "http://localhost"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_limits() {
        let args = parse(&["--leaderboard-limit", "0"]);
        assert!(args.validate().is_err());

        let args = parse(&["leaderboard", "--limit", "0"]);
        assert!(args.validate().is_err());
    }
}
