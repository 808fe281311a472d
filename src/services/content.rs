//! Content actions that feed the gamification engine
//!
//! Posting, liking and commenting validate the caller against the principal
//! the request acts for, apply the content change, then award points as a
//! best-effort secondary effect.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{normalize_email, Caller};
use crate::db::schemas::{ActionType, Article, Comment, LearningPath, NewArticle, NewLearningPath};
use crate::db::DocumentStore;
use crate::types::{EngineError, Result};

use super::events::{EngineEvent, EventBus};
use super::points::{AwardOutcome, PointsService};

/// Comment submitted by a user
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    pub author_email: String,
    #[serde(default)]
    pub author_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostReceipt {
    pub article: Article,
    pub award: AwardOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeReceipt {
    pub article_id: String,
    /// False when the user had already liked the article
    pub newly_liked: bool,
    /// Award to the article's author
    pub award: AwardOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReceipt {
    pub article_id: String,
    pub comment: Comment,
    pub award: AwardOutcome,
}

pub struct ContentService {
    store: Arc<dyn DocumentStore>,
    points: Arc<PointsService>,
    events: Arc<EventBus>,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        points: Arc<PointsService>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            points,
            events,
        }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    pub async fn get_article(&self, id: &str) -> Result<Article> {
        self.store
            .get_article(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("article {}", id)))
    }

    pub async fn articles_by_author(&self, author_email: &str) -> Result<Vec<Article>> {
        let author_email = normalize_email(author_email);
        if author_email.is_empty() {
            return Err(EngineError::InvalidInput("email is required".into()));
        }
        self.store.articles_by_author(&author_email).await
    }

    pub async fn list_learning_paths(&self) -> Result<Vec<LearningPath>> {
        self.store.list_learning_paths().await
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    pub async fn post_article(
        &self,
        caller: &Caller,
        mut input: NewArticle,
    ) -> Result<PostReceipt> {
        if input.title.trim().is_empty() {
            return Err(EngineError::InvalidInput("title is required".into()));
        }
        input.author_email = caller.authorize(&input.author_email)?.to_string();

        let article = Article::new(input);
        self.store.insert_article(&article).await?;

        debug!(id = %article.id, author = %article.author_email, "Article posted");
        self.events.emit(EngineEvent::ArticlePosted {
            id: article.id.clone(),
            author_email: article.author_email.clone(),
        });

        let award = self
            .points
            .award_best_effort(&article.author_email, ActionType::PostArticle)
            .await;

        Ok(PostReceipt { article, award })
    }

    /// Like an article; only a new like rewards the author
    pub async fn like_article(
        &self,
        caller: &Caller,
        article_id: &str,
        user_email: &str,
    ) -> Result<LikeReceipt> {
        let user_email = caller.authorize(user_email)?;
        let article = self.get_article(article_id).await?;

        let update = self
            .store
            .add_like(article_id, user_email)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("article {}", article_id)))?;

        if !update.changed() {
            return Ok(LikeReceipt {
                article_id: article_id.to_string(),
                newly_liked: false,
                award: AwardOutcome::Skipped,
            });
        }

        self.events.emit(EngineEvent::ArticleLiked {
            id: article_id.to_string(),
            user_email: user_email.to_string(),
        });
        let award = self
            .points
            .award_best_effort(&article.author_email, ActionType::ReceiveLike)
            .await;

        Ok(LikeReceipt {
            article_id: article_id.to_string(),
            newly_liked: true,
            award,
        })
    }

    /// Withdraw a like; points already awarded stay
    pub async fn unlike_article(
        &self,
        caller: &Caller,
        article_id: &str,
        user_email: &str,
    ) -> Result<bool> {
        let user_email = caller.authorize(user_email)?;

        let update = self
            .store
            .remove_like(article_id, user_email)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("article {}", article_id)))?;

        if update.changed() {
            self.events.emit(EngineEvent::ArticleUnliked {
                id: article_id.to_string(),
                user_email: user_email.to_string(),
            });
        }
        Ok(update.changed())
    }

    pub async fn add_comment(
        &self,
        caller: &Caller,
        article_id: &str,
        input: CommentInput,
    ) -> Result<CommentReceipt> {
        let text = input.text.trim();
        if text.is_empty() {
            return Err(EngineError::InvalidInput("comment text is required".into()));
        }
        let author_email = caller.authorize(&input.author_email)?;

        let comment = Comment {
            author_email: author_email.to_string(),
            author_name: input.author_name,
            text: text.to_string(),
        };
        if !self.store.push_comment(article_id, &comment).await? {
            return Err(EngineError::NotFound(format!("article {}", article_id)));
        }

        self.events.emit(EngineEvent::CommentAdded {
            article_id: article_id.to_string(),
            author_email: comment.author_email.clone(),
        });
        let award = self
            .points
            .award_best_effort(&comment.author_email, ActionType::Comment)
            .await;

        Ok(CommentReceipt {
            article_id: article_id.to_string(),
            comment,
            award,
        })
    }

    /// Delete an article owned by the caller
    ///
    /// Progress records that reference the article keep the dangling id.
    pub async fn delete_article(&self, caller: &Caller, id: &str) -> Result<()> {
        let article = self.get_article(id).await?;
        caller.authorize(&article.author_email)?;

        if !self.store.delete_article(id).await? {
            return Err(EngineError::NotFound(format!("article {}", id)));
        }
        self.events.emit(EngineEvent::ArticleDeleted { id: id.to_string() });
        Ok(())
    }

    /// Create a learning path whose sequence references existing articles
    pub async fn create_learning_path(&self, input: NewLearningPath) -> Result<LearningPath> {
        if input.title.trim().is_empty() {
            return Err(EngineError::InvalidInput("title is required".into()));
        }
        for article_id in &input.article_sequence {
            if self.store.get_article(article_id).await?.is_none() {
                return Err(EngineError::NotFound(format!("article {}", article_id)));
            }
        }

        let path = LearningPath::new(input);
        self.store.insert_learning_path(&path).await?;
        self.events.emit(EngineEvent::LearningPathCreated {
            id: path.id.clone(),
            title: path.title.clone(),
        });
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Difficulty;
    use crate::db::InMemoryStore;
    use crate::types::ErrorKind;

    fn service() -> (ContentService, Arc<PointsService>) {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(EventBus::new());
        let points = Arc::new(PointsService::new(store.clone(), events.clone()));
        (ContentService::new(store, points.clone(), events), points)
    }

    fn draft(author: &str) -> NewArticle {
        NewArticle {
            title: "Borrowing".into(),
            author_email: author.into(),
            category: "Tech".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_post_article_awards_author() {
        let (content, points) = service();
        let ana = Caller::new("ana@x.com");

        let receipt = content.post_article(&ana, draft("ana@x.com")).await.unwrap();

        assert!(receipt.award.is_awarded());
        let profile = points.profile("ana@x.com").await.unwrap().unwrap();
        assert_eq!(profile.points, 50);
        assert_eq!(content.articles_by_author("ana@x.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_post_article_for_someone_else_forbidden() {
        let (content, _) = service();

        let err = content
            .post_article(&Caller::new("bo@x.com"), draft("ana@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_like_is_rewarded_once() {
        let (content, points) = service();
        let ana = Caller::new("ana@x.com");
        let bo = Caller::new("bo@x.com");
        let article = content.post_article(&ana, draft("ana@x.com")).await.unwrap().article;

        let first = content.like_article(&bo, &article.id, "bo@x.com").await.unwrap();
        let again = content.like_article(&bo, &article.id, "bo@x.com").await.unwrap();

        assert!(first.newly_liked);
        assert!(!again.newly_liked);
        assert_eq!(again.award, AwardOutcome::Skipped);
        let profile = points.profile("ana@x.com").await.unwrap().unwrap();
        assert_eq!(profile.points, 55);
        assert_eq!(content.get_article(&article.id).await.unwrap().like_count(), 1);

        assert!(content.unlike_article(&bo, &article.id, "bo@x.com").await.unwrap());
        assert!(!content.unlike_article(&bo, &article.id, "bo@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_comment_validation_and_award() {
        let (content, points) = service();
        let ana = Caller::new("ana@x.com");
        let bo = Caller::new("bo@x.com");
        let article = content.post_article(&ana, draft("ana@x.com")).await.unwrap().article;

        let err = content
            .add_comment(
                &bo,
                &article.id,
                CommentInput {
                    author_email: "bo@x.com".into(),
                    author_name: "Bo".into(),
                    text: "   ".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let receipt = content
            .add_comment(
                &bo,
                &article.id,
                CommentInput {
                    author_email: "bo@x.com".into(),
                    author_name: "Bo".into(),
                    text: "Great read".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.comment.text, "Great read");
        assert_eq!(points.profile("bo@x.com").await.unwrap().unwrap().points, 10);

        let err = content
            .add_comment(
                &bo,
                "missing",
                CommentInput {
                    author_email: "bo@x.com".into(),
                    author_name: "Bo".into(),
                    text: "Hello?".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_only_author_deletes() {
        let (content, _) = service();
        let ana = Caller::new("ana@x.com");
        let article = content.post_article(&ana, draft("ana@x.com")).await.unwrap().article;

        let err = content
            .delete_article(&Caller::new("bo@x.com"), &article.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        content.delete_article(&ana, &article.id).await.unwrap();
        let err = content.get_article(&article.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_learning_path_requires_existing_articles() {
        let (content, _) = service();

        let err = content
            .create_learning_path(NewLearningPath {
                title: "Dangling".into(),
                description: String::new(),
                category: "Tech".into(),
                difficulty: Difficulty::Advanced,
                estimated_hours: 1,
                article_sequence: vec!["nope".into()],
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
