//! EduHive Engine - learning progress and gamification
//!
//! Tracks learners through ordered learning paths of articles and rewards
//! platform activity with points, levels and a leaderboard.
//!
//! ## Modules
//!
//! - **Progress**: Enrollment, completion and next-article recommendation
//! - **Points**: Point awards, levels and activity history
//! - **Leaderboard**: Users ranked by points
//! - **Content**: Posting, liking and commenting on articles
//! - **Store**: MongoDB and in-memory document stores behind one trait

pub mod auth;
pub mod config;
pub mod db;
pub mod seed;
pub mod services;
pub mod types;

pub use auth::Caller;
pub use config::Args;
pub use services::{Engine, EngineOptions};
pub use types::{EngineError, ErrorKind, Result};
