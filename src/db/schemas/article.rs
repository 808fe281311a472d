//! Article document schema
//!
//! Only the fields the engine reads or mutates are modelled; the article
//! body is carried through untouched.

use std::collections::BTreeSet;

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::normalize_email;
use crate::db::mongo::IntoIndexes;

/// Collection name for articles
pub const ARTICLE_COLLECTION: &str = "articles";

/// Article document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub content: String,

    /// Owner of the article
    pub author_email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Emails of users who liked the article; membership means "liked"
    #[serde(default)]
    pub likes: BTreeSet<String>,

    /// Comments in the order they were posted
    #[serde(default)]
    pub comments: Vec<Comment>,

    pub created_at: DateTime,
}

/// A single comment on an article
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author_email: String,
    /// Display name shown next to the comment
    #[serde(default)]
    pub author_name: String,
    pub text: String,
}

/// Input for posting an article
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub author_email: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    /// Build a fresh article from user input with a new id
    pub fn new(input: NewArticle) -> Self {
        Self {
            id: ObjectId::new().to_hex(),
            title: input.title.trim().to_string(),
            content: input.content,
            author_email: normalize_email(&input.author_email),
            author_name: input.author_name,
            category: input.category,
            tags: input.tags.into_iter().collect(),
            likes: BTreeSet::new(),
            comments: Vec::new(),
            created_at: DateTime::now(),
        }
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

impl IntoIndexes for Article {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "authorEmail": 1 },
            Some(
                IndexOptions::builder()
                    .name("author_email_index".to_string())
                    .build(),
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_dedups_tags() {
        let article = Article::new(NewArticle {
            title: "  Ownership in practice ".into(),
            author_email: "ana@x.com".into(),
            tags: vec!["rust".into(), "memory".into(), "rust".into()],
            ..Default::default()
        });

        assert_eq!(article.title, "Ownership in practice");
        assert_eq!(article.tags.len(), 2);
        assert_eq!(article.like_count(), 0);
        assert_eq!(article.id.len(), 24);
    }

    #[test]
    fn test_article_serializes_camel_case() {
        let article = Article::new(NewArticle {
            title: "Traits".into(),
            author_email: "ana@x.com".into(),
            ..Default::default()
        });
        let doc = bson::to_document(&article).unwrap();

        assert!(doc.contains_key("_id"));
        assert!(doc.contains_key("authorEmail"));
        assert!(doc.contains_key("createdAt"));
        assert!(!doc.contains_key("authorName"));
    }
}
