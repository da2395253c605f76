//! Habit and category management.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{Category, Habit};

/// Manager for habits and categories.
pub struct HabitManager<'a> {
    conn: &'a Connection,
}

impl<'a> HabitManager<'a> {
    /// Create a new habit manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new habit.
    pub fn create(&self, habit: &Habit) -> Result<(), HabitError> {
        self.conn.execute(
            "INSERT INTO habits (id, user_id, category_id, name, is_good, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit.id.to_string(),
                habit.user_id.to_string(),
                habit.category_id.map(|id| id.to_string()),
                habit.name,
                habit.is_good,
                habit.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a habit by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<Habit>, HabitError> {
        self.conn
            .query_row(
                "SELECT id, user_id, category_id, name, is_good, created_at
                 FROM habits WHERE id = ?1",
                params![id.to_string()],
                parse_habit_row,
            )
            .optional()
            .map_err(HabitError::from)
    }

    /// Get all habits for a user, newest first.
    pub fn get_for_user(&self, user_id: Uuid) -> Result<Vec<Habit>, HabitError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, category_id, name, is_good, created_at
             FROM habits
             WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], parse_habit_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(HabitError::from)
    }

    /// Count a user's habits.
    pub fn count_for_user(&self, user_id: Uuid) -> Result<u32, HabitError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM habits WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(HabitError::from)
    }

    /// Rename a habit.
    pub fn rename(&self, id: Uuid, name: &str) -> Result<(), HabitError> {
        let updated = self.conn.execute(
            "UPDATE habits SET name = ?1 WHERE id = ?2",
            params![name, id.to_string()],
        )?;

        if updated == 0 {
            return Err(HabitError::NotFound(id));
        }

        Ok(())
    }

    /// Delete a habit and everything under it.
    ///
    /// The cascade (attempts, then goals, then the habit) is application-level;
    /// the schema does not enforce it.
    pub fn delete(&self, id: Uuid) -> Result<bool, HabitError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM goal_attempts WHERE goal_id IN
             (SELECT id FROM goals WHERE habit_id = ?1)",
            params![id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM goals WHERE habit_id = ?1",
            params![id.to_string()],
        )?;
        let deleted = tx.execute("DELETE FROM habits WHERE id = ?1", params![id.to_string()])?;

        tx.commit()?;

        Ok(deleted > 0)
    }

    /// Create a new category.
    pub fn create_category(&self, category: &Category) -> Result<(), HabitError> {
        self.conn.execute(
            "INSERT INTO categories (id, user_id, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id.to_string(),
                category.user_id.to_string(),
                category.name,
                category.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get all categories for a user.
    pub fn categories_for_user(&self, user_id: Uuid) -> Result<Vec<Category>, HabitError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, created_at
             FROM categories
             WHERE user_id = ?1
             ORDER BY name ASC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            let id_str: String = row.get(0)?;
            let user_id_str: String = row.get(1)?;
            let created_at_str: String = row.get(3)?;

            Ok(Category {
                id: Uuid::parse_str(&id_str).unwrap_or_default(),
                user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
                name: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(HabitError::from)
    }
}

/// Parse a database row into a Habit.
fn parse_habit_row(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let category_id_str: Option<String> = row.get(2)?;
    let created_at_str: String = row.get(5)?;

    Ok(Habit {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        category_id: category_id_str.and_then(|s| Uuid::parse_str(&s).ok()),
        name: row.get(3)?,
        is_good: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Habit management errors.
#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Habit not found: {0}")]
    NotFound(Uuid),
}
