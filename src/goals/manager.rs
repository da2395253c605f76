//! Goal management.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{Goal, Priority, Weekday};

/// Manager for goals.
pub struct GoalManager<'a> {
    conn: &'a Connection,
}

impl<'a> GoalManager<'a> {
    /// Create a new goal manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new goal.
    ///
    /// Rejects an empty weekday set or an inverted date range before
    /// anything touches the attempt lifecycle.
    pub fn create(&self, goal: &Goal) -> Result<(), GoalError> {
        goal.validate().map_err(GoalError::ValidationError)?;

        self.conn.execute(
            "INSERT INTO goals
             (id, user_id, habit_id, name, priority, start_date, finish_date,
              goal_success, week_days_json, is_completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                goal.id.to_string(),
                goal.user_id.to_string(),
                goal.habit_id.to_string(),
                goal.name,
                goal.priority.display_name(),
                goal.start_date.to_string(),
                goal.finish_date.to_string(),
                goal.goal_success,
                serde_json::to_string(&goal.week_days)?,
                goal.is_completed,
                goal.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a goal by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<Goal>, GoalError> {
        self.conn
            .query_row(
                "SELECT id, user_id, habit_id, name, priority, start_date, finish_date,
                        goal_success, week_days_json, is_completed, created_at
                 FROM goals WHERE id = ?1",
                params![id.to_string()],
                parse_goal_row,
            )
            .optional()
            .map_err(GoalError::from)
    }

    /// Get a goal by ID, erroring when absent.
    pub fn get_required(&self, id: Uuid) -> Result<Goal, GoalError> {
        self.get(id)?.ok_or(GoalError::NotFound(id))
    }

    /// Get all goals for a user.
    pub fn get_for_user(&self, user_id: Uuid) -> Result<Vec<Goal>, GoalError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, habit_id, name, priority, start_date, finish_date,
                    goal_success, week_days_json, is_completed, created_at
             FROM goals
             WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], parse_goal_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(GoalError::from)
    }

    /// Get all goals attached to a habit.
    pub fn get_for_habit(&self, habit_id: Uuid) -> Result<Vec<Goal>, GoalError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, habit_id, name, priority, start_date, finish_date,
                    goal_success, week_days_json, is_completed, created_at
             FROM goals
             WHERE habit_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![habit_id.to_string()], parse_goal_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(GoalError::from)
    }

    /// Update a goal's editable fields.
    pub fn update(&self, goal: &Goal) -> Result<(), GoalError> {
        goal.validate().map_err(GoalError::ValidationError)?;

        let updated = self.conn.execute(
            "UPDATE goals SET
             name = ?1, priority = ?2, start_date = ?3, finish_date = ?4,
             goal_success = ?5, week_days_json = ?6
             WHERE id = ?7",
            params![
                goal.name,
                goal.priority.display_name(),
                goal.start_date.to_string(),
                goal.finish_date.to_string(),
                goal.goal_success,
                serde_json::to_string(&goal.week_days)?,
                goal.id.to_string(),
            ],
        )?;

        if updated == 0 {
            return Err(GoalError::NotFound(goal.id));
        }

        Ok(())
    }

    /// Mark a goal completed.
    pub fn mark_completed(&self, id: Uuid) -> Result<(), GoalError> {
        let updated = self.conn.execute(
            "UPDATE goals SET is_completed = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;

        if updated == 0 {
            return Err(GoalError::NotFound(id));
        }

        Ok(())
    }

    /// Delete a goal and its attempts.
    pub fn delete(&self, id: Uuid) -> Result<bool, GoalError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM goal_attempts WHERE goal_id = ?1",
            params![id.to_string()],
        )?;
        let deleted = tx.execute("DELETE FROM goals WHERE id = ?1", params![id.to_string()])?;

        tx.commit()?;

        Ok(deleted > 0)
    }

    /// Count a user's goals whose completed-attempt count has reached
    /// their success threshold.
    ///
    /// Completed attempts are retained as history after auto-completion,
    /// so this also covers goals completed in the past.
    pub fn count_reached_for_user(&self, user_id: Uuid) -> Result<u32, GoalError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM goals g
                 WHERE g.user_id = ?1
                   AND (SELECT COUNT(*) FROM goal_attempts a
                        WHERE a.goal_id = g.id AND a.is_completed = 1) >= g.goal_success",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(GoalError::from)
    }
}

/// Parse a database row into a Goal.
fn parse_goal_row(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let habit_id_str: String = row.get(2)?;
    let priority_str: String = row.get(4)?;
    let start_date_str: String = row.get(5)?;
    let finish_date_str: String = row.get(6)?;
    let week_days_json: String = row.get(8)?;
    let created_at_str: String = row.get(10)?;

    let week_days: Vec<Weekday> = serde_json::from_str(&week_days_json).unwrap_or_default();

    Ok(Goal {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        habit_id: Uuid::parse_str(&habit_id_str).unwrap_or_default(),
        name: row.get(3)?,
        priority: Priority::from_str(&priority_str).unwrap_or_default(),
        start_date: NaiveDate::parse_from_str(&start_date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        finish_date: NaiveDate::parse_from_str(&finish_date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        goal_success: row.get(7)?,
        week_days,
        is_completed: row.get(9)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Goal management errors.
#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Goal not found: {0}")]
    NotFound(Uuid),

    #[error("Attempt not found: {0}")]
    AttemptNotFound(Uuid),
}
