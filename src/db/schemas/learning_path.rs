//! Learning path document schema
//!
//! A path is an ordered sequence of article ids. The order is the
//! recommendation order and is never rearranged after creation.

use std::fmt;

use bson::{oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for learning paths
pub const LEARNING_PATH_COLLECTION: &str = "learningPaths";

/// Pedagogical difficulty of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "Beginner"),
            Difficulty::Intermediate => write!(f, "Intermediate"),
            Difficulty::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Learning path document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_hours: u32,
    /// Article ids in recommendation order
    #[serde(default)]
    pub article_sequence: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Input for creating a learning path
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewLearningPath {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_hours: u32,
    #[serde(default)]
    pub article_sequence: Vec<String>,
}

impl LearningPath {
    pub fn new(input: NewLearningPath) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new().to_hex(),
            title: input.title,
            description: input.description,
            category: input.category,
            difficulty: input.difficulty,
            estimated_hours: input.estimated_hours,
            article_sequence: input.article_sequence,
            created_at: now,
            updated_at: now,
        }
    }
}

impl IntoIndexes for LearningPath {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![]
    }
}
