//! Document store seam
//!
//! The engine never talks to a database directly. Every read and write goes
//! through [`DocumentStore`], whose mutations are atomic per document: the
//! implementation must apply an increment, an add-to-set or an append in a
//! single write rather than read, modify locally and write back.

use crate::db::schemas::{
    Activity, Article, Comment, LearningPath, ProgressSet, SetUpdate, UserProfile, UserProgress,
};
use crate::types::Result;

/// Storage operations over the articles, learningPaths, userProgress and
/// users collections
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    // ---------------------------------------------------------------------
    // Articles
    // ---------------------------------------------------------------------

    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    async fn insert_article(&self, article: &Article) -> Result<()>;

    /// Up to `limit` articles in store order
    async fn list_articles(&self, limit: usize) -> Result<Vec<Article>>;

    async fn articles_by_author(&self, author_email: &str) -> Result<Vec<Article>>;

    /// Add a like; `None` when the article does not exist
    async fn add_like(&self, article_id: &str, user_email: &str) -> Result<Option<SetUpdate>>;

    /// Remove a like; `None` when the article does not exist
    async fn remove_like(&self, article_id: &str, user_email: &str) -> Result<Option<SetUpdate>>;

    /// Append a comment; `false` when the article does not exist
    async fn push_comment(&self, article_id: &str, comment: &Comment) -> Result<bool>;

    async fn delete_article(&self, id: &str) -> Result<bool>;

    // ---------------------------------------------------------------------
    // Learning paths
    // ---------------------------------------------------------------------

    async fn get_learning_path(&self, id: &str) -> Result<Option<LearningPath>>;

    async fn insert_learning_path(&self, path: &LearningPath) -> Result<()>;

    async fn list_learning_paths(&self) -> Result<Vec<LearningPath>>;

    async fn delete_learning_path(&self, id: &str) -> Result<bool>;

    // ---------------------------------------------------------------------
    // User progress
    // ---------------------------------------------------------------------

    async fn find_progress(&self, user_email: &str) -> Result<Option<UserProgress>>;

    /// Return the progress record, inserting an empty one if absent.
    /// The flag is true when this call created the record.
    async fn get_or_create_progress(&self, user_email: &str) -> Result<(UserProgress, bool)>;

    /// Add `member` to one membership set and touch `lastUpdated`, creating
    /// the record if absent. Reports whether membership changed.
    async fn add_progress_member(
        &self,
        user_email: &str,
        set: ProgressSet,
        member: &str,
    ) -> Result<SetUpdate>;

    // ---------------------------------------------------------------------
    // Gamification profiles
    // ---------------------------------------------------------------------

    /// Add `activity.points` to the user's total, recompute the level from
    /// the new total and append the activity, all in one atomic write.
    /// Creates the profile on first use and returns the updated profile.
    async fn apply_points(&self, user_email: &str, activity: &Activity) -> Result<UserProfile>;

    async fn get_user(&self, email: &str) -> Result<Option<UserProfile>>;

    /// Users by points descending; ties go to the earliest `lastActivity`,
    /// then to the lexicographically smaller email
    async fn top_users(&self, limit: usize) -> Result<Vec<UserProfile>>;
}
