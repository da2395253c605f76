//! Email delivery client.
//!
//! Thin wrapper over the provider's HTTP API. Calls are synchronous with a
//! bounded timeout; failures are typed and left to the dispatcher, which
//! logs them instead of failing the triggering mutation.

use std::time::Duration;

use serde_json::json;

use crate::storage::EmailSettings;

/// Email delivery client.
pub struct EmailClient {
    http: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl EmailClient {
    /// Create a client from settings.
    pub fn new(settings: &EmailSettings) -> Result<Self, EmailError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EmailError::ClientError(e.to_string()))?;

        Ok(Self {
            http,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            from_address: settings.from_address.clone(),
        })
    }

    /// Check whether delivery is configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Send one email.
    pub fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        if !self.is_configured() {
            return Err(EmailError::NotConfigured);
        }

        let body = json!({
            "from": self.from_address,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| EmailError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmailError::ProviderError(response.status().as_u16()));
        }

        tracing::debug!("Sent email to {} ({})", to, subject);

        Ok(())
    }
}

/// Email delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email delivery is not configured")]
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
    fn test_unconfigured_client_refuses_to_send() {
        let client = EmailClient::new(&EmailSettings::default()).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.send("a@example.com", "Hi", "<p>Hi</p>"),
            Err(EmailError::NotConfigured)
        ));
    }
}
