//! Leaderboard view
//!
//! Read-only projection of gamification profiles ranked by points.

use std::sync::Arc;

use serde::Serialize;

use crate::db::schemas::UserProfile;
use crate::db::DocumentStore;
use crate::types::{EngineError, Result};

/// Default number of leaderboard rows
pub const DEFAULT_LIMIT: usize = 50;

/// One ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub email: String,
    pub points: u64,
    pub level: u64,
    pub last_activity: bson::DateTime,
}

pub struct LeaderboardView {
    store: Arc<dyn DocumentStore>,
}

impl LeaderboardView {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Top `limit` users by points, highest first
    ///
    /// Equal totals are ordered by earliest `lastActivity`, then by email.
    pub async fn top_users(&self, limit: usize) -> Result<Vec<UserProfile>> {
        if limit == 0 {
            return Err(EngineError::InvalidInput("limit must be positive".into()));
        }
        self.store.top_users(limit).await
    }

    /// Same ordering as [`top_users`](Self::top_users) with ranks attached
    pub async fn ranked(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let users = self.top_users(limit).await?;
        Ok(users
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                rank: i + 1,
                email: user.email,
                points: user.points,
                level: user.level,
                last_activity: user.last_activity,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ActionType, Activity};
    use crate::db::InMemoryStore;
    use crate::types::ErrorKind;
    use bson::DateTime;

    async fn seed(store: &InMemoryStore, email: &str, points: u64, at_millis: i64) {
        store
            .apply_points(
                email,
                &Activity {
                    action: ActionType::Comment,
                    points,
                    timestamp: DateTime::from_millis(at_millis),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_top_users_descending() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "a@x.com", 10, 1_000).await;
        seed(&store, "b@x.com", 90, 2_000).await;
        seed(&store, "c@x.com", 50, 3_000).await;
        let view = LeaderboardView::new(store);

        let top = view.top_users(2).await.unwrap();
        let points: Vec<u64> = top.iter().map(|u| u.points).collect();

        assert_eq!(points, vec![90, 50]);
    }

    #[tokio::test]
    async fn test_ties_go_to_earliest_activity() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "late@x.com", 40, 5_000).await;
        seed(&store, "early@x.com", 40, 1_000).await;
        seed(&store, "same-b@x.com", 40, 3_000).await;
        seed(&store, "same-a@x.com", 40, 3_000).await;
        let view = LeaderboardView::new(store);

        let ranked = view.ranked(DEFAULT_LIMIT).await.unwrap();
        let emails: Vec<&str> = ranked.iter().map(|e| e.email.as_str()).collect();

        assert_eq!(
            emails,
            vec!["early@x.com", "same-a@x.com", "same-b@x.com", "late@x.com"]
        );
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let view = LeaderboardView::new(Arc::new(InMemoryStore::new()));

        let err = view.top_users(0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
