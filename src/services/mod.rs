//! Services layer for the engine
//!
//! Business logic that coordinates the document store, the points ledger and
//! the event bus.
//!
//! ## Services
//!
//! - **Points**: Point awards, level computation and activity history
//! - **Progress**: Enrollment, completion tracking and recommendations
//! - **Leaderboard**: Ranked read-only projection of user profiles
//! - **Content**: Posting, liking and commenting, which feed points
//! - **Events**: Broadcast of every state change

pub mod content;
pub mod events;
pub mod leaderboard;
pub mod points;
pub mod progress;

use std::sync::Arc;

use crate::db::DocumentStore;

pub use content::{CommentInput, CommentReceipt, ContentService, LikeReceipt, PostReceipt};
pub use events::{
    spawn_listener, spawn_logging_listener, EngineEvent, EventBus, EventListener,
    LoggingEventListener,
};
pub use leaderboard::{LeaderboardEntry, LeaderboardView, DEFAULT_LIMIT};
pub use points::{compute_level, AwardOutcome, PointsService, LEVEL_SPAN};
pub use progress::{
    percentage, CompletionAwards, CompletionReceipt, EnrollmentReceipt, PathProgress,
    ProgressTracker, Recommendation,
};

/// Behavior switches for the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub completion_awards: CompletionAwards,
}

/// All engine services wired over one store and one event bus
pub struct Engine {
    pub store: Arc<dyn DocumentStore>,
    pub events: Arc<EventBus>,
    pub points: Arc<PointsService>,
    pub progress: ProgressTracker,
    pub leaderboard: LeaderboardView,
    pub content: ContentService,
}

impl Engine {
    pub fn new(store: Arc<dyn DocumentStore>, options: EngineOptions) -> Self {
        let events = Arc::new(EventBus::new());
        let points = Arc::new(PointsService::new(store.clone(), events.clone()));
        let progress = ProgressTracker::new(
            store.clone(),
            points.clone(),
            events.clone(),
            options.completion_awards,
        );
        let leaderboard = LeaderboardView::new(store.clone());
        let content = ContentService::new(store.clone(), points.clone(), events.clone());

        Self {
            store,
            events,
            points,
            progress,
            leaderboard,
            content,
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }
}
