//! Progress tracker
//!
//! Enrollment and completion are set memberships on the user's progress
//! record. Completion is global, so path progress is always computed from the
//! intersection of a path's sequence with the completion set.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::Caller;
use crate::db::schemas::{ActionType, Article, LearningPath, ProgressSet, UserProgress};
use crate::db::DocumentStore;
use crate::types::{EngineError, Result};

use super::events::{EngineEvent, EventBus};
use super::points::{AwardOutcome, PointsService};

/// When `complete_article` awards points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CompletionAwards {
    /// Every call awards points, including repeats of an already completed article
    #[default]
    EveryCall,
    /// Only the call that first adds the article to the completion set awards points
    FirstOnly,
}

/// Success value of `enroll`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentReceipt {
    pub user_email: String,
    pub path_id: String,
    pub award: AwardOutcome,
}

/// Success value of `complete_article`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReceipt {
    pub user_email: String,
    pub article_id: String,
    /// False when the article was already in the completion set
    pub first_completion: bool,
    pub award: AwardOutcome,
}

/// Next item on a path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "article", rename_all = "snake_case")]
pub enum Recommendation {
    Next(Article),
    /// Every article of the path is completed
    Completed,
}

/// Progress through one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathProgress {
    pub path_id: String,
    pub total: usize,
    pub completed: usize,
    /// Whole percent in [0, 100], rounded half up
    pub percentage: u8,
    /// Completed members of the path, in sequence order
    pub completed_ids: Vec<String>,
}

impl PathProgress {
    /// Measure `path` against a user's global completion set
    pub fn measure(path: &LearningPath, progress: &UserProgress) -> Self {
        let completed_ids: Vec<String> = path
            .article_sequence
            .iter()
            .filter(|id| progress.has_completed(id))
            .cloned()
            .collect();
        let total = path.article_sequence.len();
        let completed = completed_ids.len();

        Self {
            path_id: path.id.clone(),
            total,
            completed,
            percentage: percentage(completed, total),
            completed_ids,
        }
    }
}

/// `round(completed / total * 100)` with halves rounded up; 0 for an empty path
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Tracks enrollments and completions against learning paths
pub struct ProgressTracker {
    store: Arc<dyn DocumentStore>,
    points: Arc<PointsService>,
    events: Arc<EventBus>,
    completion_awards: CompletionAwards,
}

impl ProgressTracker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        points: Arc<PointsService>,
        events: Arc<EventBus>,
        completion_awards: CompletionAwards,
    ) -> Self {
        Self {
            store,
            points,
            events,
            completion_awards,
        }
    }

    pub async fn get_or_create_progress(
        &self,
        caller: &Caller,
        user_email: &str,
    ) -> Result<UserProgress> {
        let user_email = caller.authorize(user_email)?;
        self.ensure_progress(user_email).await
    }

    /// Enroll a user in a learning path and award enrollment points
    pub async fn enroll(
        &self,
        caller: &Caller,
        user_email: &str,
        path_id: &str,
    ) -> Result<EnrollmentReceipt> {
        let user_email = caller.authorize(user_email)?;
        self.load_path(path_id).await?;
        self.ensure_progress(user_email).await?;

        let update = self
            .store
            .add_progress_member(user_email, ProgressSet::EnrolledPaths, path_id)
            .await?;
        if !update.changed() {
            return Err(EngineError::AlreadyEnrolled(path_id.to_string()));
        }

        debug!(user = user_email, path = path_id, "Enrolled");
        self.events.emit(EngineEvent::Enrolled {
            user_email: user_email.to_string(),
            path_id: path_id.to_string(),
        });

        let award = self
            .points
            .award_best_effort(user_email, ActionType::EnrollLearningPath)
            .await;

        Ok(EnrollmentReceipt {
            user_email: user_email.to_string(),
            path_id: path_id.to_string(),
            award,
        })
    }

    /// Mark an article completed and award completion points
    pub async fn complete_article(
        &self,
        caller: &Caller,
        user_email: &str,
        article_id: &str,
    ) -> Result<CompletionReceipt> {
        let user_email = caller.authorize(user_email)?;
        if self.store.get_article(article_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("article {}", article_id)));
        }

        let update = self
            .store
            .add_progress_member(user_email, ProgressSet::CompletedArticles, article_id)
            .await?;
        let first_completion = update.changed();

        self.events.emit(EngineEvent::ArticleCompleted {
            user_email: user_email.to_string(),
            article_id: article_id.to_string(),
            first_completion,
        });

        let award = match self.completion_awards {
            CompletionAwards::FirstOnly if !first_completion => AwardOutcome::Skipped,
            _ => {
                self.points
                    .award_best_effort(user_email, ActionType::CompleteArticle)
                    .await
            }
        };

        Ok(CompletionReceipt {
            user_email: user_email.to_string(),
            article_id: article_id.to_string(),
            first_completion,
            award,
        })
    }

    /// First article of the path's sequence the user has not completed
    pub async fn next_recommended(
        &self,
        caller: &Caller,
        user_email: &str,
        path_id: &str,
    ) -> Result<Recommendation> {
        let user_email = caller.authorize(user_email)?;
        let (path, progress) = self.enrolled_path(user_email, path_id).await?;

        for article_id in path
            .article_sequence
            .iter()
            .filter(|id| !progress.has_completed(id))
        {
            match self.store.get_article(article_id).await? {
                Some(article) => return Ok(Recommendation::Next(article)),
                None => {
                    // Deleted after the path was built; move on to the next one
                    warn!(path = path_id, article = %article_id, "Skipping dangling article id");
                }
            }
        }

        Ok(Recommendation::Completed)
    }

    /// Completion metrics for one enrolled path
    pub async fn path_progress(
        &self,
        caller: &Caller,
        user_email: &str,
        path_id: &str,
    ) -> Result<PathProgress> {
        let user_email = caller.authorize(user_email)?;
        let (path, progress) = self.enrolled_path(user_email, path_id).await?;
        Ok(PathProgress::measure(&path, &progress))
    }

    /// Progress for every enrolled path that still exists
    pub async fn all_path_progress(
        &self,
        caller: &Caller,
        user_email: &str,
    ) -> Result<Vec<PathProgress>> {
        let user_email = caller.authorize(user_email)?;
        let progress = self.load_progress(user_email).await?;

        let mut summaries = Vec::with_capacity(progress.enrolled_paths.len());
        for path_id in &progress.enrolled_paths {
            match self.store.get_learning_path(path_id).await? {
                Some(path) => summaries.push(PathProgress::measure(&path, &progress)),
                None => warn!(user = user_email, path = %path_id, "Enrolled path no longer exists"),
            }
        }
        Ok(summaries)
    }

    async fn ensure_progress(&self, user_email: &str) -> Result<UserProgress> {
        let (progress, created) = self.store.get_or_create_progress(user_email).await?;
        if created {
            self.events.emit(EngineEvent::ProgressCreated {
                user_email: user_email.to_string(),
            });
        }
        Ok(progress)
    }

    async fn load_path(&self, path_id: &str) -> Result<LearningPath> {
        self.store
            .get_learning_path(path_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("learning path {}", path_id)))
    }

    async fn load_progress(&self, user_email: &str) -> Result<UserProgress> {
        self.store
            .find_progress(user_email)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("progress for {}", user_email)))
    }

    /// Resolve progress and path and check enrollment
    async fn enrolled_path(
        &self,
        user_email: &str,
        path_id: &str,
    ) -> Result<(LearningPath, UserProgress)> {
        let progress = self.load_progress(user_email).await?;
        let path = self.load_path(path_id).await?;
        if !progress.is_enrolled(path_id) {
            return Err(EngineError::NotEnrolled(path_id.to_string()));
        }
        Ok((path, progress))
    }
}
