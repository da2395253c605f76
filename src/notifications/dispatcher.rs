//! Notification dispatch gate.
//!
//! Consults the user's preference row and hands qualifying events to the
//! email collaborator. This is a gate, not a queue: delivery is
//! synchronous and best-effort, and a delivery failure never propagates
//! into the mutation that raised the event.

use rusqlite::Connection;

use super::email::EmailClient;
use super::{NotificationEvent, SettingsStore};
use crate::users::UserManager;

/// Preference-gated notification dispatcher.
pub struct NotificationDispatcher<'a> {
    conn: &'a Connection,
    email: &'a EmailClient,
    base_url: String,
}

impl<'a> NotificationDispatcher<'a> {
    /// Create a dispatcher over a database connection and email client.
    pub fn new(conn: &'a Connection, email: &'a EmailClient, base_url: &str) -> Self {
        Self {
            conn,
            email,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Dispatch one event. Returns whether it was handed to the email
    /// collaborator.
    ///
    /// No-ops silently when the user has no settings row or any relevant
    /// toggle is off. Delivery errors are logged and swallowed here.
    pub fn dispatch(&self, event: &NotificationEvent) -> bool {
        let settings = match SettingsStore::new(self.conn).get(event.user_id) {
            Ok(Some(settings)) => settings,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("Failed to load notification settings: {}", e);
                return false;
            }
        };

        if !settings.allows(event.kind) {
            return false;
        }

        let user = match UserManager::new(self.conn).get(event.user_id) {
            Ok(Some(user)) => user,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("Failed to load user for notification: {}", e);
                return false;
            }
        };

        let html = self.render(event);
        match self.email.send(&user.email, &event.title, &html) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Email delivery failed for {}: {}", user.email, e);
                false
            }
        }
    }

    /// Render the event body, resolving the link against the base URL.
    fn render(&self, event: &NotificationEvent) -> String {
        match &event.link {
            Some(link) => format!(
                "<p>{}</p><p><a href=\"{}/{}\">Open HabitForge</a></p>",
                event.message,
                self.base_url,
                link.trim_start_matches('/')
            ),
            None => format!("<p>{}</p>", event.message),
        }
    }
}
