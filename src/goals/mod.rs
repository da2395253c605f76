//! Goals, attempt lifecycle, and streak derivation.

pub mod attempts;
pub mod manager;
pub mod streaks;
pub mod types;

pub use attempts::{AttemptManager, AttemptOutcome};
pub use manager::{GoalError, GoalManager};
pub use streaks::{AdherenceSplit, DailyAdherence, HabitStreak, StreakService};
pub use types::{Goal, GoalAttempt, Priority, Weekday};
