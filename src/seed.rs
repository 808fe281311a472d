//! Sample learning path seeding
//!
//! Administrative bootstrap that groups the first articles of the catalogue
//! into three starter paths.

use serde::Serialize;
use tracing::info;

use crate::db::schemas::{Article, Difficulty, LearningPath, NewLearningPath};
use crate::db::DocumentStore;
use crate::types::Result;

/// Articles read when building the sample paths
const SEED_ARTICLE_LIMIT: usize = 10;

/// Articles per sample path
const SLICE_LEN: usize = 3;

struct Template {
    title: &'static str,
    description: &'static str,
    difficulty: Difficulty,
    estimated_hours: u32,
}

const TEMPLATES: [Template; 3] = [
    Template {
        title: "Beginner's Guide to Programming",
        description: "Start your programming journey with these foundational articles",
        difficulty: Difficulty::Beginner,
        estimated_hours: 10,
    },
    Template {
        title: "Advanced Web Development",
        description: "Take your web development skills to the next level",
        difficulty: Difficulty::Advanced,
        estimated_hours: 15,
    },
    Template {
        title: "Data Science Fundamentals",
        description: "Learn the basics of data science and analytics",
        difficulty: Difficulty::Intermediate,
        estimated_hours: 12,
    },
];

/// One inserted path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeededPath {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub article_count: usize,
}

/// Result of a seeding run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub inserted: Vec<SeededPath>,
}

/// Build the sample paths over consecutive slices of `articles`
///
/// A template whose slice starts past the end of `articles` is skipped; a
/// partially filled slice still yields a (shorter) path.
pub fn sample_learning_paths(articles: &[Article]) -> Vec<LearningPath> {
    TEMPLATES
        .iter()
        .enumerate()
        .filter_map(|(i, template)| {
            let start = i * SLICE_LEN;
            if start >= articles.len() {
                return None;
            }
            let end = (start + SLICE_LEN).min(articles.len());
            Some(LearningPath::new(NewLearningPath {
                title: template.title.to_string(),
                description: template.description.to_string(),
                category: "Tech".to_string(),
                difficulty: template.difficulty,
                estimated_hours: template.estimated_hours,
                article_sequence: articles[start..end].iter().map(|a| a.id.clone()).collect(),
            }))
        })
        .collect()
}

/// Insert the sample paths built from the current catalogue
pub async fn seed_learning_paths(store: &dyn DocumentStore) -> Result<SeedReport> {
    let articles = store.list_articles(SEED_ARTICLE_LIMIT).await?;
    if articles.is_empty() {
        info!("No articles found, add some articles before seeding learning paths");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();
    for path in sample_learning_paths(&articles) {
        store.insert_learning_path(&path).await?;
        info!(title = %path.title, difficulty = %path.difficulty, "Seeded learning path");
        report.inserted.push(SeededPath {
            id: path.id,
            title: path.title,
            difficulty: path.difficulty,
            article_count: path.article_sequence.len(),
        });
    }

    info!(count = report.inserted.len(), "Learning path seeding complete");
    Ok(report)
}
