//! Per-user progress document schema
//!
//! Completions are global: an article completed once counts towards every
//! path whose sequence contains it.

use std::collections::BTreeSet;

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for progress records
pub const USER_PROGRESS_COLLECTION: &str = "userProgress";

/// Progress document, one per user email
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_email: String,
    #[serde(default)]
    pub enrolled_paths: BTreeSet<String>,
    #[serde(default)]
    pub completed_articles: BTreeSet<String>,
    pub last_updated: DateTime,
}

/// Which membership set of a progress record an update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSet {
    EnrolledPaths,
    CompletedArticles,
}

impl ProgressSet {
    /// Stored field name
    pub fn field(self) -> &'static str {
        match self {
            ProgressSet::EnrolledPaths => "enrolledPaths",
            ProgressSet::CompletedArticles => "completedArticles",
        }
    }
}

/// Outcome of an add-to-set or remove-from-set update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetUpdate {
    /// Membership changed
    Changed,
    /// Membership was already in the requested state
    Unchanged,
}

impl SetUpdate {
    pub fn changed(self) -> bool {
        self == SetUpdate::Changed
    }
}

impl UserProgress {
    pub fn new(user_email: &str) -> Self {
        Self {
            user_email: user_email.to_string(),
            enrolled_paths: BTreeSet::new(),
            completed_articles: BTreeSet::new(),
            last_updated: DateTime::now(),
        }
    }

    pub fn is_enrolled(&self, path_id: &str) -> bool {
        self.enrolled_paths.contains(path_id)
    }

    pub fn has_completed(&self, article_id: &str) -> bool {
        self.completed_articles.contains(article_id)
    }

    /// Mutable view of one membership set
    pub fn set_mut(&mut self, set: ProgressSet) -> &mut BTreeSet<String> {
        match set {
            ProgressSet::EnrolledPaths => &mut self.enrolled_paths,
            ProgressSet::CompletedArticles => &mut self.completed_articles,
        }
    }
}

impl IntoIndexes for UserProgress {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "userEmail": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_email_unique".to_string())
                    .build(),
            ),
        )]
    }
}
