//! Database schemas for the engine
//!
//! Defines MongoDB document structures for articles, learning paths,
//! user progress and gamification profiles.

mod article;
mod learning_path;
mod user_profile;
mod user_progress;

pub use article::{Article, Comment, NewArticle, ARTICLE_COLLECTION};
pub use learning_path::{Difficulty, LearningPath, NewLearningPath, LEARNING_PATH_COLLECTION};
pub use user_profile::{ActionType, Activity, UserProfile, USER_COLLECTION};
pub use user_progress::{ProgressSet, SetUpdate, UserProgress, USER_PROGRESS_COLLECTION};
