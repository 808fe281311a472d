//! Event system for engine operations
//!
//! Every state change the engine makes is broadcast as an [`EngineEvent`].
//! Failed best-effort point awards travel on the same bus, which gives them
//! an observable error channel instead of disappearing.

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::db::schemas::ActionType;

/// Events emitted by engine services
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    // Progress events
    ProgressCreated {
        user_email: String,
    },
    Enrolled {
        user_email: String,
        path_id: String,
    },
    ArticleCompleted {
        user_email: String,
        article_id: String,
        first_completion: bool,
    },

    // Gamification events
    PointsAwarded {
        user_email: String,
        action: ActionType,
        points: u64,
        total_points: u64,
        level: u64,
    },
    PointsAwardFailed {
        user_email: String,
        action: ActionType,
        error: String,
    },

    // Content events
    ArticlePosted {
        id: String,
        author_email: String,
    },
    ArticleLiked {
        id: String,
        user_email: String,
    },
    ArticleUnliked {
        id: String,
        user_email: String,
    },
    CommentAdded {
        article_id: String,
        author_email: String,
    },
    ArticleDeleted {
        id: String,
    },
    LearningPathCreated {
        id: String,
        title: String,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

/// Events buffered per subscriber before it starts lagging
const EVENT_BUFFER: usize = 1024;

/// Broadcast channel every engine service publishes to
///
/// Publishing never blocks and never fails; a subscriber that falls more than
/// [`EVENT_BUFFER`] events behind skips the oldest ones.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn emit(&self, event: EngineEvent) {
        trace!(event = ?event, "Emitting engine event");
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Enrolled {
                user_email,
                path_id,
            } => {
                info!(user = %user_email, path = %path_id, "Enrolled in learning path");
            }
            EngineEvent::ArticleCompleted {
                user_email,
                article_id,
                first_completion,
            } => {
                info!(
                    user = %user_email,
                    article = %article_id,
                    first = first_completion,
                    "Article completed"
                );
            }
            EngineEvent::PointsAwarded {
                user_email,
                action,
                points,
                level,
                ..
            } => {
                debug!(user = %user_email, action = %action, points, level, "Points awarded");
            }
            EngineEvent::PointsAwardFailed {
                user_email,
                action,
                error,
            } => {
                warn!(user = %user_email, action = %action, error = %error, "Points lagging");
            }
            _ => {
                trace!(event = ?event, "Engine event");
            }
        }
    }
}

/// Run `listener` over every event published after this call
///
/// The task ends once every handle to the bus has been dropped and the
/// buffered events are drained.
pub fn spawn_listener<L>(bus: &EventBus, listener: L) -> tokio::task::JoinHandle<()>
where
    L: EventListener + 'static,
{
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event listener fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Event listener stopped");
    })
}

pub fn spawn_logging_listener(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    spawn_listener(bus, LoggingEventListener)
}
