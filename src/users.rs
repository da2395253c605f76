//! User accounts.
//!
//! Identity itself comes from an external auth provider; this is just the
//! local account row other tables hang off.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address (notification delivery target)
    pub email: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            created_at: Utc::now(),
        }
    }
}

/// Manager for user accounts.
pub struct UserManager<'a> {
    conn: &'a Connection,
}

impl<'a> UserManager<'a> {
    /// Create a new user manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a user.
    pub fn create(&self, user: &User) -> Result<(), UserError> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a user by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<User>, UserError> {
        self.conn
            .query_row(
                "SELECT id, name, email, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                parse_user_row,
            )
            .optional()
            .map_err(UserError::from)
    }

    /// Get a user by ID, erroring when absent.
    pub fn get_required(&self, id: Uuid) -> Result<User, UserError> {
        self.get(id)?.ok_or(UserError::NotFound(id))
    }
}

/// Parse a database row into a User.
fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let created_at_str: String = row.get(3)?;

    Ok(User {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// User account errors.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("User not found: {0}")]
    NotFound(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_create_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        let manager = UserManager::new(db.connection());

        let user = User::new("Ada".to_string(), "ada@example.com".to_string());
        manager.create(&user).unwrap();

        let retrieved = manager.get(user.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Ada");
        assert_eq!(retrieved.email, "ada@example.com");
    }

    #[test]
    fn test_get_required_missing() {
        let db = Database::open_in_memory().unwrap();
        let manager = UserManager::new(db.connection());

        assert!(matches!(
            manager.get_required(Uuid::new_v4()),
            Err(UserError::NotFound(_))
        ));
    }
}
