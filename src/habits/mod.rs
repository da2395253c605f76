//! Habit definitions and management.

pub mod manager;
pub mod types;

pub use manager::{HabitError, HabitManager};
pub use types::{Category, Habit};
