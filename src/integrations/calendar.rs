//! Third-party calendar API client.
//!
//! Event creation and deletion are idempotent on the provider side, so a
//! transport failure gets exactly one retry. Provider rejections do not.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use crate::storage::CalendarSettings;

/// Calendar API client.
pub struct CalendarClient {
    http: reqwest::blocking::Client,
    api_url: String,
    access_token: String,
}

impl CalendarClient {
    /// Create a client from settings.
    pub fn new(settings: &CalendarSettings) -> Result<Self, CalendarError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CalendarError::ClientError(e.to_string()))?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            access_token: settings.access_token.clone(),
        })
    }

    /// Check whether sync is configured.
    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Create an all-day event; returns the provider's event id.
    pub fn create_event(&self, title: &str, date: NaiveDate) -> Result<String, CalendarError> {
        if !self.is_configured() {
            return Err(CalendarError::NotConfigured);
        }

        let body = json!({
            "summary": title,
            "start": { "date": date.to_string() },
            "end": { "date": date.to_string() },
        });

        let url = format!("{}/calendars/primary/events", self.api_url);
        let response = self.with_retry(|| {
            self.http
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
        })?;

        if !response.status().is_success() {
            return Err(CalendarError::ProviderError(response.status().as_u16()));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| CalendarError::RequestFailed(e.to_string()))?;

        payload["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CalendarError::RequestFailed("missing event id".to_string()))
    }

    /// Delete an event by provider id.
    pub fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        if !self.is_configured() {
            return Err(CalendarError::NotConfigured);
        }

        let url = format!("{}/calendars/primary/events/{}", self.api_url, event_id);
        let response = self.with_retry(|| {
            self.http
                .delete(&url)
                .bearer_auth(&self.access_token)
                .send()
        })?;

        // Already deleted counts as deleted
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(CalendarError::ProviderError(response.status().as_u16()));
        }

        Ok(())
    }

    /// Run a request, retrying once on transport failure.
    fn with_retry<F>(&self, mut call: F) -> Result<reqwest::blocking::Response, CalendarError>
    where
        F: FnMut() -> Result<reqwest::blocking::Response, reqwest::Error>,
    {
        match call() {
            Ok(response) => Ok(response),
            Err(first) => {
                tracing::debug!("Calendar request failed, retrying once: {}", first);
                call().map_err(|e| CalendarError::RequestFailed(e.to_string()))
            }
        }
    }
}

/// Calendar integration errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar sync is not configured")]
    NotConfigured,

    #[error("HTTP client error: {0}")]
    ClientError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Provider returned status {0}")]
    ProviderError(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_client_refuses_calls() {
        let client = CalendarClient::new(&CalendarSettings::default()).unwrap();
        assert!(!client.is_configured());

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(
            client.create_event("Run", date),
            Err(CalendarError::NotConfigured)
        ));
        assert!(matches!(
            client.delete_event("evt_1"),
            Err(CalendarError::NotConfigured)
        ));
    }
}
