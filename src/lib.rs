//! HabitForge - Habit and Goal Tracking Engine
//!
//! An open-source, self-hosted habit and goal tracking engine built in Rust.
//! Provides scheduled goal attempts with automatic lifecycle management,
//! streak and adherence derivation, an achievement engine, score-based
//! leaderboards, and preference-gated email notifications.

pub mod achievements;
pub mod actions;
pub mod goals;
pub mod habits;
pub mod integrations;
pub mod notifications;
pub mod stats;
pub mod storage;
pub mod users;

// Re-export commonly used types
pub use actions::{ActionContext, ActionError};
pub use goals::{AttemptManager, Goal, GoalManager, StreakService, Weekday};
pub use habits::{Habit, HabitManager};
pub use stats::StatsAggregator;
pub use storage::{AppConfig, Database};
