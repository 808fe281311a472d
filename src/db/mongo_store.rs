//! MongoDB-backed document store
//!
//! Membership changes use `$addToSet` / `$pull` guarded by a `$ne` filter so
//! the modified count tells whether membership actually changed. Point awards
//! run as a single aggregation-pipeline update: the increment, the level
//! recomputation and the activity append see the same document version.

use bson::{doc, DateTime, Document};
use tracing::{debug, info};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    Activity, Article, Comment, LearningPath, ProgressSet, SetUpdate, UserProfile, UserProgress,
    ARTICLE_COLLECTION, LEARNING_PATH_COLLECTION, USER_COLLECTION, USER_PROGRESS_COLLECTION,
};
use crate::db::store::DocumentStore;
use crate::services::points::LEVEL_SPAN;
use crate::types::{EngineError, Result};

/// [`DocumentStore`] over the four MongoDB collections
pub struct MongoStore {
    articles: MongoCollection<Article>,
    paths: MongoCollection<LearningPath>,
    progress: MongoCollection<UserProgress>,
    users: MongoCollection<UserProfile>,
}

impl MongoStore {
    /// Open all collections and apply their indexes
    pub async fn connect(mongo: &MongoClient) -> Result<Self> {
        let store = Self {
            articles: mongo.collection(ARTICLE_COLLECTION).await?,
            paths: mongo.collection(LEARNING_PATH_COLLECTION).await?,
            progress: mongo.collection(USER_PROGRESS_COLLECTION).await?,
            users: mongo.collection(USER_COLLECTION).await?,
        };
        info!(db = mongo.db_name(), "MongoDB document store ready");
        Ok(store)
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Sort order of the leaderboard
pub(crate) fn leaderboard_sort() -> Document {
    doc! { "points": -1, "lastActivity": 1, "email": 1 }
}

/// Filter matching a progress record whose `set` does not yet hold `member`
pub(crate) fn missing_member_filter(user_email: &str, set: ProgressSet, member: &str) -> Document {
    let mut filter = doc! { "userEmail": user_email };
    filter.insert(set.field(), doc! { "$ne": member });
    filter
}

/// Upsert body that creates an empty progress record without touching an
/// existing one
pub(crate) fn progress_on_insert(now: DateTime) -> Document {
    doc! {
        "$setOnInsert": {
            "enrolledPaths": [],
            "completedArticles": [],
            "lastUpdated": now,
        }
    }
}

/// `$addToSet` of `member` plus a `lastUpdated` touch
pub(crate) fn guarded_add(set: ProgressSet, member: &str, now: DateTime) -> Document {
    let mut add = Document::new();
    add.insert(set.field(), member);
    doc! { "$addToSet": add, "$set": { "lastUpdated": now } }
}

/// Upsert body that creates the progress record already holding `member`
///
/// An existing record only gets its `lastUpdated` touched.
pub(crate) fn member_on_insert(set: ProgressSet, member: &str, now: DateTime) -> Document {
    let other = match set {
        ProgressSet::EnrolledPaths => ProgressSet::CompletedArticles,
        ProgressSet::CompletedArticles => ProgressSet::EnrolledPaths,
    };
    let mut on_insert = Document::new();
    on_insert.insert(set.field(), vec![member]);
    on_insert.insert(other.field(), Vec::<String>::new());
    doc! { "$set": { "lastUpdated": now }, "$setOnInsert": on_insert }
}

/// What `add_progress_member` does after its fallback upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertFollowUp {
    /// The upsert inserted the record with the member in place
    Created,
    /// A record already existed; only the guarded add can tell whether the
    /// member is new
    RetryGuardedAdd,
}

pub(crate) fn upsert_follow_up(upserted: bool) -> UpsertFollowUp {
    if upserted {
        UpsertFollowUp::Created
    } else {
        UpsertFollowUp::RetryGuardedAdd
    }
}

pub(crate) fn set_update(modified_count: u64) -> SetUpdate {
    if modified_count > 0 {
        SetUpdate::Changed
    } else {
        SetUpdate::Unchanged
    }
}

/// Pipeline that awards `activity` to `user_email`
///
/// Stage one adds the points and appends the activity (defaulting missing
/// fields so the same pipeline creates the profile on upsert); stage two
/// derives the level from the already-incremented total.
pub(crate) fn points_pipeline(user_email: &str, activity: &Activity) -> Vec<Document> {
    let amount = clamp_i64(activity.points);
    let entry = doc! {
        "type": activity.action.as_str(),
        "points": amount,
        "timestamp": activity.timestamp,
    };

    vec![
        doc! {
            "$set": {
                "email": user_email,
                "points": { "$add": [{ "$ifNull": ["$points", 0_i64] }, amount] },
                "badges": { "$ifNull": ["$badges", []] },
                "activities": {
                    "$concatArrays": [{ "$ifNull": ["$activities", []] }, [entry]]
                },
                "lastActivity": activity.timestamp,
            }
        },
        doc! {
            "$set": {
                "level": {
                    "$add": [
                        { "$toLong": { "$floor": { "$divide": ["$points", clamp_i64(LEVEL_SPAN)] } } },
                        1_i64,
                    ]
                }
            }
        },
    ]
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        self.articles.find_one(doc! { "_id": id }).await
    }

    async fn insert_article(&self, article: &Article) -> Result<()> {
        self.articles.insert_one(article).await
    }

    async fn list_articles(&self, limit: usize) -> Result<Vec<Article>> {
        self.articles
            .find_many(doc! {}, Some(doc! { "createdAt": 1, "_id": 1 }), Some(clamp_i64(limit as u64)))
            .await
    }

    async fn articles_by_author(&self, author_email: &str) -> Result<Vec<Article>> {
        self.articles
            .find_many(
                doc! { "authorEmail": author_email },
                Some(doc! { "createdAt": 1, "_id": 1 }),
                None,
            )
            .await
    }

    async fn add_like(&self, article_id: &str, user_email: &str) -> Result<Option<SetUpdate>> {
        let result = self
            .articles
            .update_one(
                doc! { "_id": article_id, "likes": { "$ne": user_email } },
                doc! { "$addToSet": { "likes": user_email } },
                false,
            )
            .await?;

        if result.modified_count > 0 {
            return Ok(Some(SetUpdate::Changed));
        }
        Ok(self
            .get_article(article_id)
            .await?
            .map(|_| SetUpdate::Unchanged))
    }

    async fn remove_like(&self, article_id: &str, user_email: &str) -> Result<Option<SetUpdate>> {
        let result = self
            .articles
            .update_one(
                doc! { "_id": article_id, "likes": user_email },
                doc! { "$pull": { "likes": user_email } },
                false,
            )
            .await?;

        if result.modified_count > 0 {
            return Ok(Some(SetUpdate::Changed));
        }
        Ok(self
            .get_article(article_id)
            .await?
            .map(|_| SetUpdate::Unchanged))
    }

    async fn push_comment(&self, article_id: &str, comment: &Comment) -> Result<bool> {
        let comment = bson::to_bson(comment)
            .map_err(|e| EngineError::InvalidInput(format!("Unencodable comment: {}", e)))?;
        let result = self
            .articles
            .update_one(
                doc! { "_id": article_id },
                doc! { "$push": { "comments": comment } },
                false,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        self.articles.delete_one(doc! { "_id": id }).await
    }

    async fn get_learning_path(&self, id: &str) -> Result<Option<LearningPath>> {
        self.paths.find_one(doc! { "_id": id }).await
    }

    async fn insert_learning_path(&self, path: &LearningPath) -> Result<()> {
        self.paths.insert_one(path).await
    }

    async fn list_learning_paths(&self) -> Result<Vec<LearningPath>> {
        self.paths
            .find_many(doc! {}, Some(doc! { "createdAt": 1, "_id": 1 }), None)
            .await
    }

    async fn delete_learning_path(&self, id: &str) -> Result<bool> {
        self.paths.delete_one(doc! { "_id": id }).await
    }

    async fn find_progress(&self, user_email: &str) -> Result<Option<UserProgress>> {
        self.progress.find_one(doc! { "userEmail": user_email }).await
    }

    async fn get_or_create_progress(&self, user_email: &str) -> Result<(UserProgress, bool)> {
        let result = self
            .progress
            .update_one(
                doc! { "userEmail": user_email },
                progress_on_insert(DateTime::now()),
                true,
            )
            .await?;
        let created = result.upserted_id.is_some();
        if created {
            debug!(user = user_email, "Progress record created");
        }

        let progress = self.find_progress(user_email).await?.ok_or_else(|| {
            EngineError::StoreUnavailable(format!("progress for {} vanished after upsert", user_email))
        })?;
        Ok((progress, created))
    }

    async fn add_progress_member(
        &self,
        user_email: &str,
        set: ProgressSet,
        member: &str,
    ) -> Result<SetUpdate> {
        let now = DateTime::now();
        let added = self
            .progress
            .update_one(
                missing_member_filter(user_email, set, member),
                guarded_add(set, member, now),
                false,
            )
            .await?;
        if added.modified_count > 0 {
            return Ok(SetUpdate::Changed);
        }

        // Either the member is already present or the record does not exist yet
        let touched = self
            .progress
            .update_one(
                doc! { "userEmail": user_email },
                member_on_insert(set, member, now),
                true,
            )
            .await?;

        match upsert_follow_up(touched.upserted_id.is_some()) {
            UpsertFollowUp::Created => Ok(SetUpdate::Changed),
            UpsertFollowUp::RetryGuardedAdd => {
                // The record may have been created concurrently without the member
                let retried = self
                    .progress
                    .update_one(
                        missing_member_filter(user_email, set, member),
                        guarded_add(set, member, now),
                        false,
                    )
                    .await?;
                Ok(set_update(retried.modified_count))
            }
        }
    }

    async fn apply_points(&self, user_email: &str, activity: &Activity) -> Result<UserProfile> {
        self.users
            .find_one_and_update(
                doc! { "email": user_email },
                points_pipeline(user_email, activity),
                true,
            )
            .await?
            .ok_or_else(|| {
                EngineError::StoreUnavailable(format!("no profile returned for {}", user_email))
            })
    }

    async fn get_user(&self, email: &str) -> Result<Option<UserProfile>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserProfile>> {
        self.users
            .find_many(doc! {}, Some(leaderboard_sort()), Some(clamp_i64(limit as u64)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ActionType;

    #[test]
    fn test_points_pipeline_increments_before_level() {
        let activity = Activity {
            action: ActionType::CompleteArticle,
            points: 15,
            timestamp: DateTime::now(),
        };
        let pipeline = points_pipeline("u@x.com", &activity);

        assert_eq!(pipeline.len(), 2);
        let first = pipeline[0].get_document("$set").unwrap();
        assert!(first.contains_key("points"));
        assert!(first.contains_key("activities"));
        assert!(!first.contains_key("level"));

        let second = pipeline[1].get_document("$set").unwrap();
        assert!(second.contains_key("level"));
    }

    #[test]
    fn test_points_pipeline_activity_entry() {
        let activity = Activity {
            action: ActionType::ReceiveLike,
            points: 5,
            timestamp: DateTime::now(),
        };
        let pipeline = points_pipeline("u@x.com", &activity);
        let set = pipeline[0].get_document("$set").unwrap();
        let concat = set
            .get_document("activities")
            .unwrap()
            .get_array("$concatArrays")
            .unwrap();
        let appended = concat[1].as_array().unwrap()[0].as_document().unwrap();

        assert_eq!(appended.get_str("type").unwrap(), "receive_like");
        assert_eq!(appended.get_i64("points").unwrap(), 5);
    }

    #[test]
    fn test_missing_member_filter() {
        let filter = missing_member_filter("u@x.com", ProgressSet::EnrolledPaths, "p1");

        assert_eq!(filter.get_str("userEmail").unwrap(), "u@x.com");
        assert_eq!(
            filter.get_document("enrolledPaths").unwrap(),
            &doc! { "$ne": "p1" }
        );
    }

    #[test]
    fn test_existing_record_retries_guarded_add() {
        // Record created between the guarded add and the upsert
        assert_eq!(upsert_follow_up(false), UpsertFollowUp::RetryGuardedAdd);
        assert_eq!(upsert_follow_up(true), UpsertFollowUp::Created);

        assert_eq!(set_update(1), SetUpdate::Changed);
        assert_eq!(set_update(0), SetUpdate::Unchanged);
    }

    #[test]
    fn test_member_on_insert_carries_member() {
        let now = DateTime::now();
        let update = member_on_insert(ProgressSet::CompletedArticles, "a1", now);

        let on_insert = update.get_document("$setOnInsert").unwrap();
        let completed = on_insert.get_array("completedArticles").unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].as_str(), Some("a1"));
        assert!(on_insert.get_array("enrolledPaths").unwrap().is_empty());
        assert!(!on_insert.contains_key("lastUpdated"));
        assert_eq!(
            update.get_document("$set").unwrap().get_datetime("lastUpdated").unwrap(),
            &now
        );
    }

    #[test]
    fn test_guarded_add_targets_one_set() {
        let update = guarded_add(ProgressSet::EnrolledPaths, "p1", DateTime::now());

        assert_eq!(
            update.get_document("$addToSet").unwrap(),
            &doc! { "enrolledPaths": "p1" }
        );
    }

    #[test]
    fn test_leaderboard_sort_keys() {
        let sort = leaderboard_sort();
        let keys: Vec<&String> = sort.keys().collect();

        assert_eq!(keys, vec!["points", "lastActivity", "email"]);
        assert_eq!(sort.get_i32("points").unwrap(), -1);
    }
}
