//! Points and leveling
//!
//! Levels are a pure function of the point total. Awards go through the
//! store's atomic `apply_points`, so concurrent awards to the same user sum
//! without lost updates and the stored level always matches the stored total.

use std::sync::Arc;

use bson::DateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::normalize_email;
use crate::db::schemas::{ActionType, Activity, UserProfile};
use crate::db::DocumentStore;
use crate::types::{EngineError, Result};

use super::events::{EngineEvent, EventBus};

/// Points needed per level
pub const LEVEL_SPAN: u64 = 100;

/// Level for a point total: `floor(points / 100) + 1`
pub fn compute_level(points: u64) -> u64 {
    points / LEVEL_SPAN + 1
}

impl ActionType {
    /// Fixed point schedule
    pub const fn points(self) -> u64 {
        match self {
            ActionType::PostArticle => 50,
            ActionType::EnrollLearningPath => 20,
            ActionType::CompleteArticle => 15,
            ActionType::Comment => 10,
            ActionType::ReceiveLike => 5,
        }
    }
}

/// Result of a point award attached to another action
///
/// The award is a secondary effect: a failure is reported here and never
/// turns the primary action into an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AwardOutcome {
    Awarded {
        points: u64,
        total_points: u64,
        level: u64,
    },
    /// The action was valid but no award applies
    Skipped,
    Failed {
        error: String,
    },
}

impl AwardOutcome {
    pub fn is_awarded(&self) -> bool {
        matches!(self, AwardOutcome::Awarded { .. })
    }
}

/// Service that awards points and maintains levels
pub struct PointsService {
    store: Arc<dyn DocumentStore>,
    events: Arc<EventBus>,
}

impl PointsService {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Award `points` to `user_email` for `action`
    pub async fn award_points(
        &self,
        user_email: &str,
        points: u64,
        action: ActionType,
    ) -> Result<UserProfile> {
        let user_email = normalize_email(user_email);
        if user_email.is_empty() {
            return Err(EngineError::InvalidInput("userEmail is required".into()));
        }
        if points == 0 {
            return Err(EngineError::InvalidInput("points must be positive".into()));
        }

        let activity = Activity {
            action,
            points,
            timestamp: DateTime::now(),
        };
        let profile = self.store.apply_points(&user_email, &activity).await?;

        debug!(
            user = %user_email,
            action = %action,
            points,
            total = profile.points,
            level = profile.level,
            "Points awarded"
        );
        self.events.emit(EngineEvent::PointsAwarded {
            user_email,
            action,
            points,
            total_points: profile.points,
            level: profile.level,
        });

        Ok(profile)
    }

    /// Award the scheduled points for `action`, absorbing any failure
    pub async fn award_best_effort(&self, user_email: &str, action: ActionType) -> AwardOutcome {
        let points = action.points();
        match self.award_points(user_email, points, action).await {
            Ok(profile) => AwardOutcome::Awarded {
                points,
                total_points: profile.points,
                level: profile.level,
            },
            Err(e) => {
                warn!(
                    user = user_email,
                    action = %action,
                    error = %e,
                    "Point award failed; primary action kept"
                );
                self.events.emit(EngineEvent::PointsAwardFailed {
                    user_email: user_email.to_string(),
                    action,
                    error: e.to_string(),
                });
                AwardOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Current gamification profile, if the user has earned anything yet
    pub async fn profile(&self, user_email: &str) -> Result<Option<UserProfile>> {
        self.store.get_user(&normalize_email(user_email)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, StoreCollection};
    use crate::types::ErrorKind;

    fn service() -> (PointsService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let service = PointsService::new(store.clone(), Arc::new(EventBus::new()));
        (service, store)
    }

    #[test]
    fn test_compute_level_boundaries() {
        assert_eq!(compute_level(0), 1);
        assert_eq!(compute_level(99), 1);
        assert_eq!(compute_level(100), 2);
        assert_eq!(compute_level(199), 2);
        assert_eq!(compute_level(250), 3);
        assert_eq!(compute_level(u64::MAX), u64::MAX / 100 + 1);
    }

    #[test]
    fn test_point_schedule() {
        assert_eq!(ActionType::PostArticle.points(), 50);
        assert_eq!(ActionType::EnrollLearningPath.points(), 20);
        assert_eq!(ActionType::CompleteArticle.points(), 15);
        assert_eq!(ActionType::Comment.points(), 10);
        assert_eq!(ActionType::ReceiveLike.points(), 5);
    }

    #[tokio::test]
    async fn test_award_points_is_additive() {
        let (service, _) = service();

        for amount in [30, 45, 60] {
            service
                .award_points("u@x.com", amount, ActionType::Comment)
                .await
                .unwrap();
        }

        let profile = service.profile("u@x.com").await.unwrap().unwrap();
        assert_eq!(profile.points, 135);
        assert_eq!(profile.level, compute_level(135));
        assert_eq!(profile.activities.len(), 3);
        assert_eq!(profile.activities[1].points, 45);
    }

    #[tokio::test]
    async fn test_award_points_keys_by_canonical_email() {
        let (service, store) = service();

        service
            .award_points(" U@X.com ", 20, ActionType::EnrollLearningPath)
            .await
            .unwrap();
        service
            .award_points("u@x.com", 15, ActionType::CompleteArticle)
            .await
            .unwrap();

        let top = store.top_users(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].email, "u@x.com");
        assert_eq!(top[0].points, 35);
        assert!(service.profile("U@x.COM").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_award_points_rejects_bad_input() {
        let (service, _) = service();

        let err = service
            .award_points("", 10, ActionType::Comment)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = service
            .award_points("u@x.com", 0, ActionType::Comment)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_awards_do_not_lose_updates() {
        let (service, _) = service();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let service = service.clone();
                let action = if i % 2 == 0 {
                    ActionType::ReceiveLike
                } else {
                    ActionType::CompleteArticle
                };
                tokio::spawn(async move {
                    service
                        .award_points("busy@x.com", action.points(), action)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let profile = service.profile("busy@x.com").await.unwrap().unwrap();
        assert_eq!(profile.points, 32 * 5 + 32 * 15);
        assert_eq!(profile.level, 7);
        assert_eq!(profile.activities.len(), 64);
    }

    #[tokio::test]
    async fn test_best_effort_reports_failure() {
        let (service, store) = service();
        store.set_unavailable(StoreCollection::Users, true);

        let outcome = service
            .award_best_effort("u@x.com", ActionType::PostArticle)
            .await;

        assert!(matches!(outcome, AwardOutcome::Failed { .. }));
    }
}
