//! Notification events, preferences, and the delivery gate.

pub mod dispatcher;
pub mod email;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dispatcher::NotificationDispatcher;
pub use email::{EmailClient, EmailError};

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// An achievement was unlocked
    AchievementUnlocked,
    /// A goal reached its success threshold
    GoalCompleted,
}

/// A notification to be gated and possibly delivered.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Relative link into the app, made absolute at delivery time
    pub link: Option<String>,
}

/// Per-user notification preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub user_id: Uuid,
    /// Master toggle
    pub enabled: bool,
    /// Achievement unlock alerts
    pub achievement_alerts: bool,
    /// Goal completion alerts
    pub goal_alerts: bool,
    /// Email delivery channel
    pub email_enabled: bool,
}

impl NotificationSettings {
    /// Default settings for a user (all alerts on, email off).
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            enabled: true,
            achievement_alerts: true,
            goal_alerts: true,
            email_enabled: false,
        }
    }

    /// Whether an event of the given kind passes this user's gate.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        if !self.enabled || !self.email_enabled {
            return false;
        }
        match kind {
            NotificationKind::AchievementUnlocked => self.achievement_alerts,
            NotificationKind::GoalCompleted => self.goal_alerts,
        }
    }
}

/// Store for notification preference rows.
pub struct SettingsStore<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsStore<'a> {
    /// Create a new settings store with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a user's settings row, if any.
    pub fn get(&self, user_id: Uuid) -> Result<Option<NotificationSettings>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT user_id, enabled, achievement_alerts, goal_alerts, email_enabled
                 FROM notification_settings WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    let user_id_str: String = row.get(0)?;
                    Ok(NotificationSettings {
                        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
                        enabled: row.get(1)?,
                        achievement_alerts: row.get(2)?,
                        goal_alerts: row.get(3)?,
                        email_enabled: row.get(4)?,
                    })
                },
            )
            .optional()
    }

    /// Insert or replace a user's settings row.
    pub fn upsert(&self, settings: &NotificationSettings) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO notification_settings
             (user_id, enabled, achievement_alerts, goal_alerts, email_enabled)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
               enabled = excluded.enabled,
               achievement_alerts = excluded.achievement_alerts,
               goal_alerts = excluded.goal_alerts,
               email_enabled = excluded.email_enabled",
            params![
                settings.user_id.to_string(),
                settings.enabled,
                settings.achievement_alerts,
                settings.goal_alerts,
                settings.email_enabled,
            ],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_gate_requires_master_and_kind_and_email() {
        let mut settings = NotificationSettings::for_user(Uuid::new_v4());
        // Email channel defaults off
        assert!(!settings.allows(NotificationKind::GoalCompleted));

        settings.email_enabled = true;
        assert!(settings.allows(NotificationKind::GoalCompleted));
        assert!(settings.allows(NotificationKind::AchievementUnlocked));

        settings.goal_alerts = false;
        assert!(!settings.allows(NotificationKind::GoalCompleted));
        assert!(settings.allows(NotificationKind::AchievementUnlocked));

        settings.enabled = false;
        assert!(!settings.allows(NotificationKind::AchievementUnlocked));
    }

    #[test]
    fn test_settings_store_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let store = SettingsStore::new(db.connection());
        let user_id = Uuid::new_v4();

        assert!(store.get(user_id).unwrap().is_none());

        let mut settings = NotificationSettings::for_user(user_id);
        settings.email_enabled = true;
        store.upsert(&settings).unwrap();
        assert_eq!(store.get(user_id).unwrap(), Some(settings.clone()));

        settings.achievement_alerts = false;
        store.upsert(&settings).unwrap();
        assert_eq!(store.get(user_id).unwrap(), Some(settings));
    }
}
