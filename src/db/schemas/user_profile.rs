//! Gamification profile schema
//!
//! Stores accumulated points, the level derived from them and an
//! append-only activity log.

use std::collections::BTreeSet;
use std::fmt;

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for gamification profiles
pub const USER_COLLECTION: &str = "users";

/// User action that earns points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PostArticle,
    EnrollLearningPath,
    CompleteArticle,
    Comment,
    ReceiveLike,
}

impl ActionType {
    /// Stored name of the action
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::PostArticle => "post_article",
            ActionType::EnrollLearningPath => "enroll_learning_path",
            ActionType::CompleteArticle => "complete_article",
            ActionType::Comment => "comment",
            ActionType::ReceiveLike => "receive_like",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the activity log
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Activity {
    #[serde(rename = "type")]
    pub action: ActionType,
    pub points: u64,
    pub timestamp: DateTime,
}

/// Gamification profile stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub points: u64,
    #[serde(default = "default_level")]
    pub level: u64,
    /// Reserved; nothing awards badges yet
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub last_activity: DateTime,
}

fn default_level() -> u64 {
    1
}

impl IntoIndexes for UserProfile {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Leaderboard ordering
            (
                doc! { "points": -1, "lastActivity": 1, "email": 1 },
                Some(
                    IndexOptions::builder()
                        .name("leaderboard_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
