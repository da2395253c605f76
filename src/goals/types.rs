//! Goal and goal-attempt type definitions.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Day of the week, Monday-first (ISO ordering).
///
/// Recurrence correctness depends on this ordering; the platform's native
/// Sunday-first index is remapped when converting from a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All seven weekdays in Monday-first order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Monday-first index (Monday = 0 .. Sunday = 6).
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Weekday of a calendar date, remapped to Monday-first ordering.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_monday() as usize]
    }

    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Goal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Parse from the stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A recurring goal tied to a habit.
///
/// Active over `[start_date, finish_date]` (inclusive), recurring on the
/// selected weekdays, completed once `goal_success` attempts succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: Uuid,
    /// User who owns this goal
    pub user_id: Uuid,
    /// Habit this goal is attached to
    pub habit_id: Uuid,
    /// Display name
    pub name: String,
    /// Priority
    pub priority: Priority,
    /// First day of the active range
    pub start_date: NaiveDate,
    /// Last day of the active range (inclusive)
    pub finish_date: NaiveDate,
    /// Number of successful attempts required to complete the goal
    pub goal_success: u32,
    /// Weekdays on which the goal recurs (non-empty)
    pub week_days: Vec<Weekday>,
    /// Whether the goal has been completed
    pub is_completed: bool,
    /// When the goal was created
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Create a new goal.
    pub fn new(
        user_id: Uuid,
        habit_id: Uuid,
        name: String,
        start_date: NaiveDate,
        finish_date: NaiveDate,
        goal_success: u32,
        week_days: Vec<Weekday>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            habit_id,
            name,
            priority: Priority::Medium,
            start_date,
            finish_date,
            goal_success,
            week_days,
            is_completed: false,
            created_at: Utc::now(),
        }
    }

    /// Check whether a date qualifies for this goal's recurrence.
    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date
            && date <= self.finish_date
            && self.week_days.contains(&Weekday::from_date(date))
    }

    /// All qualifying dates in the goal's range, ascending.
    ///
    /// Empty when the weekday set is empty or the range is inverted.
    pub fn scheduled_dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut d = self.start_date;
        while d <= self.finish_date {
            if self.week_days.contains(&Weekday::from_date(d)) {
                dates.push(d);
            }
            d += chrono::Duration::days(1);
        }
        dates
    }

    /// Validate the goal's date range and recurrence set.
    pub fn validate(&self) -> Result<(), String> {
        if self.week_days.is_empty() {
            return Err("Goal must recur on at least one weekday".to_string());
        }
        if self.start_date > self.finish_date {
            return Err(format!(
                "Goal start date {} is after finish date {}",
                self.start_date, self.finish_date
            ));
        }
        Ok(())
    }
}

/// One calendar-day instance of a goal, completable independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAttempt {
    /// Unique identifier
    pub id: Uuid,
    /// Parent goal
    pub goal_id: Uuid,
    /// Calendar date (date-only, no time component)
    pub date: NaiveDate,
    /// Whether the attempt succeeded
    pub is_completed: bool,
    /// Free-text note
    pub note: String,
    /// External calendar event, when synced
    pub calendar_event_id: Option<String>,
}

impl GoalAttempt {
    /// Create a fresh attempt for a goal on a date.
    pub fn new(goal_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal_id,
            date,
            is_completed: false,
            note: String::new(),
            calendar_event_id: None,
        }
    }
}
