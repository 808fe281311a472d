//! In-memory document store
//!
//! Backs the engine in tests and in `--store memory` mode. Each collection is
//! a `DashMap`; every mutation runs while holding the entry's shard lock, so
//! updates to the same key serialize exactly like single-document writes in
//! MongoDB. Collections can be taken offline to exercise failure handling.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::debug;

use crate::db::schemas::{
    Activity, Article, Comment, LearningPath, ProgressSet, SetUpdate, UserProfile, UserProgress,
};
use crate::db::store::DocumentStore;
use crate::services::points::compute_level;
use crate::types::{EngineError, Result};

/// Collections of the store, used to simulate outages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCollection {
    Articles,
    LearningPaths,
    UserProgress,
    Users,
}

/// Document plus its insertion sequence number
#[derive(Debug, Clone)]
struct Stored<T> {
    seq: u64,
    doc: T,
}

/// Concurrent in-memory implementation of [`DocumentStore`]
#[derive(Default)]
pub struct InMemoryStore {
    articles: DashMap<String, Stored<Article>>,
    paths: DashMap<String, Stored<LearningPath>>,
    progress: DashMap<String, UserProgress>,
    users: DashMap<String, UserProfile>,
    offline: DashSet<StoreCollection>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `collection` fail with `StoreUnavailable`
    pub fn set_unavailable(&self, collection: StoreCollection, unavailable: bool) {
        if unavailable {
            debug!(?collection, "Collection taken offline");
            self.offline.insert(collection);
        } else {
            self.offline.remove(&collection);
        }
    }

    fn check(&self, collection: StoreCollection) -> Result<()> {
        if self.offline.contains(&collection) {
            return Err(EngineError::StoreUnavailable(format!(
                "{:?} collection is offline",
                collection
            )));
        }
        Ok(())
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn sorted_articles(&self) -> Vec<Article> {
        let mut stored: Vec<Stored<Article>> =
            self.articles.iter().map(|e| e.value().clone()).collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.doc).collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        self.check(StoreCollection::Articles)?;
        Ok(self.articles.get(id).map(|e| e.doc.clone()))
    }

    async fn insert_article(&self, article: &Article) -> Result<()> {
        self.check(StoreCollection::Articles)?;
        match self.articles.entry(article.id.clone()) {
            Entry::Occupied(_) => Err(EngineError::InvalidInput(format!(
                "article {} already exists",
                article.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Stored {
                    seq: self.seq(),
                    doc: article.clone(),
                });
                Ok(())
            }
        }
    }

    async fn list_articles(&self, limit: usize) -> Result<Vec<Article>> {
        self.check(StoreCollection::Articles)?;
        Ok(self.sorted_articles().into_iter().take(limit).collect())
    }

    async fn articles_by_author(&self, author_email: &str) -> Result<Vec<Article>> {
        self.check(StoreCollection::Articles)?;
        Ok(self
            .sorted_articles()
            .into_iter()
            .filter(|a| a.author_email == author_email)
            .collect())
    }

    async fn add_like(&self, article_id: &str, user_email: &str) -> Result<Option<SetUpdate>> {
        self.check(StoreCollection::Articles)?;
        Ok(self.articles.get_mut(article_id).map(|mut entry| {
            if entry.doc.likes.insert(user_email.to_string()) {
                SetUpdate::Changed
            } else {
                SetUpdate::Unchanged
            }
        }))
    }

    async fn remove_like(&self, article_id: &str, user_email: &str) -> Result<Option<SetUpdate>> {
        self.check(StoreCollection::Articles)?;
        Ok(self.articles.get_mut(article_id).map(|mut entry| {
            if entry.doc.likes.remove(user_email) {
                SetUpdate::Changed
            } else {
                SetUpdate::Unchanged
            }
        }))
    }

    async fn push_comment(&self, article_id: &str, comment: &Comment) -> Result<bool> {
        self.check(StoreCollection::Articles)?;
        match self.articles.get_mut(article_id) {
            Some(mut entry) => {
                entry.doc.comments.push(comment.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        self.check(StoreCollection::Articles)?;
        Ok(self.articles.remove(id).is_some())
    }

    async fn get_learning_path(&self, id: &str) -> Result<Option<LearningPath>> {
        self.check(StoreCollection::LearningPaths)?;
        Ok(self.paths.get(id).map(|e| e.doc.clone()))
    }

    async fn insert_learning_path(&self, path: &LearningPath) -> Result<()> {
        self.check(StoreCollection::LearningPaths)?;
        match self.paths.entry(path.id.clone()) {
            Entry::Occupied(_) => Err(EngineError::InvalidInput(format!(
                "learning path {} already exists",
                path.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Stored {
                    seq: self.seq(),
                    doc: path.clone(),
                });
                Ok(())
            }
        }
    }

    async fn list_learning_paths(&self) -> Result<Vec<LearningPath>> {
        self.check(StoreCollection::LearningPaths)?;
        let mut stored: Vec<Stored<LearningPath>> =
            self.paths.iter().map(|e| e.value().clone()).collect();
        stored.sort_by_key(|s| s.seq);
        Ok(stored.into_iter().map(|s| s.doc).collect())
    }

    async fn delete_learning_path(&self, id: &str) -> Result<bool> {
        self.check(StoreCollection::LearningPaths)?;
        Ok(self.paths.remove(id).is_some())
    }

    async fn find_progress(&self, user_email: &str) -> Result<Option<UserProgress>> {
        self.check(StoreCollection::UserProgress)?;
        Ok(self.progress.get(user_email).map(|e| e.value().clone()))
    }

    async fn get_or_create_progress(&self, user_email: &str) -> Result<(UserProgress, bool)> {
        self.check(StoreCollection::UserProgress)?;
        let mut created = false;
        let entry = self
            .progress
            .entry(user_email.to_string())
            .or_insert_with(|| {
                created = true;
                UserProgress::new(user_email)
            });
        Ok((entry.value().clone(), created))
    }

    async fn add_progress_member(
        &self,
        user_email: &str,
        set: ProgressSet,
        member: &str,
    ) -> Result<SetUpdate> {
        self.check(StoreCollection::UserProgress)?;
        let mut entry = self
            .progress
            .entry(user_email.to_string())
            .or_insert_with(|| UserProgress::new(user_email));
        let progress = entry.value_mut();
        let inserted = progress.set_mut(set).insert(member.to_string());
        progress.last_updated = bson::DateTime::now();

        Ok(if inserted {
            SetUpdate::Changed
        } else {
            SetUpdate::Unchanged
        })
    }

    async fn apply_points(&self, user_email: &str, activity: &Activity) -> Result<UserProfile> {
        self.check(StoreCollection::Users)?;
        let mut entry = self
            .users
            .entry(user_email.to_string())
            .or_insert_with(|| UserProfile {
                email: user_email.to_string(),
                points: 0,
                level: compute_level(0),
                badges: Default::default(),
                activities: Vec::new(),
                last_activity: activity.timestamp,
            });
        let profile = entry.value_mut();
        profile.points = profile.points.saturating_add(activity.points);
        profile.level = compute_level(profile.points);
        profile.activities.push(activity.clone());
        profile.last_activity = activity.timestamp;

        Ok(profile.clone())
    }

    async fn get_user(&self, email: &str) -> Result<Option<UserProfile>> {
        self.check(StoreCollection::Users)?;
        Ok(self.users.get(email).map(|e| e.value().clone()))
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserProfile>> {
        self.check(StoreCollection::Users)?;
        let mut users: Vec<UserProfile> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(a.last_activity.cmp(&b.last_activity))
                .then_with(|| a.email.cmp(&b.email))
        });
        users.truncate(limit);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ActionType;

    fn activity(points: u64) -> Activity {
        Activity {
            action: ActionType::Comment,
            points,
            timestamp: bson::DateTime::now(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_progress_reports_creation() {
        let store = InMemoryStore::new();

        let (first, created) = store.get_or_create_progress("u@x.com").await.unwrap();
        assert!(created);
        assert!(first.enrolled_paths.is_empty());

        let (_, created_again) = store.get_or_create_progress("u@x.com").await.unwrap();
        assert!(!created_again);
    }

    #[tokio::test]
    async fn test_add_progress_member_is_set_semantics() {
        let store = InMemoryStore::new();

        let first = store
            .add_progress_member("u@x.com", ProgressSet::CompletedArticles, "a1")
            .await
            .unwrap();
        let second = store
            .add_progress_member("u@x.com", ProgressSet::CompletedArticles, "a1")
            .await
            .unwrap();

        assert_eq!(first, SetUpdate::Changed);
        assert_eq!(second, SetUpdate::Unchanged);
        let progress = store.find_progress("u@x.com").await.unwrap().unwrap();
        assert_eq!(progress.completed_articles.len(), 1);
        assert!(progress.enrolled_paths.is_empty());
    }

    #[tokio::test]
    async fn test_apply_points_creates_profile() {
        let store = InMemoryStore::new();

        let profile = store.apply_points("u@x.com", &activity(150)).await.unwrap();

        assert_eq!(profile.points, 150);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.activities.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_collection_fails() {
        let store = InMemoryStore::new();
        store.set_unavailable(StoreCollection::Users, true);

        let err = store.apply_points("u@x.com", &activity(5)).await.unwrap_err();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));

        // Other collections keep working
        assert!(store.find_progress("u@x.com").await.unwrap().is_none());

        store.set_unavailable(StoreCollection::Users, false);
        assert!(store.apply_points("u@x.com", &activity(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_like_on_missing_article() {
        let store = InMemoryStore::new();

        assert_eq!(store.add_like("missing", "u@x.com").await.unwrap(), None);
        assert!(!store
            .push_comment(
                "missing",
                &Comment {
                    author_email: "u@x.com".into(),
                    author_name: "U".into(),
                    text: "hi".into(),
                }
            )
            .await
            .unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_duplicate_inserts_keep_one() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let article = Article::new(crate::db::schemas::NewArticle {
            title: "Once".into(),
            author_email: "u@x.com".into(),
            ..Default::default()
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let article = article.clone();
                tokio::spawn(async move { store.insert_article(&article).await })
            })
            .collect();
        let mut inserted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => inserted += 1,
                Err(e) => assert!(matches!(e, EngineError::InvalidInput(_))),
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.list_articles(10).await.unwrap().len(), 1);
    }
}
