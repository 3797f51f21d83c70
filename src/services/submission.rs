use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::models::ConfirmationEvent;

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("server returned status {0}")]
    Server(u16),
}

impl SubmissionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::Network(_) => "network",
            SubmissionError::Timeout(_) => "timeout",
            SubmissionError::Server(_) => "server",
        }
    }
}

/// Transport seam for the two outbound calls. Production uses
/// [`HttpSubmissionClient`]; tests substitute a scripted mock.
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    /// POST the booking payload to the webhook. No retry at this layer;
    /// bounded retry is the lifecycle's responsibility.
    async fn submit(&self, payload: &serde_json::Value) -> Result<(), SubmissionError>;

    /// Ask the confirmation endpoint whether the booking is already
    /// confirmed. `Ok(Some(_))` is an eager confirmation; `Ok(None)` means
    /// no endpoint is configured or the endpoint had nothing to say yet.
    async fn request_confirmation(
        &self,
        booking_id: &str,
        attempt: u32,
    ) -> Result<Option<ConfirmationEvent>, SubmissionError>;
}

pub struct HttpSubmissionClient {
    webhook_url: String,
    confirmation_url: Option<String>,
    auth_token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSubmissionClient {
    pub fn new(
        webhook_url: String,
        confirmation_url: Option<String>,
        auth_token: String,
        timeout: Duration,
    ) -> Self {
        Self {
            webhook_url,
            confirmation_url,
            auth_token,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Races the request against the configured timeout. The losing future
    /// is dropped, which cancels the in-flight request.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, SubmissionError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        if !self.auth_token.is_empty() {
            request = request.bearer_auth(&self.auth_token);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| SubmissionError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Server(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, payload: &serde_json::Value) -> Result<(), SubmissionError> {
        self.post_json(&self.webhook_url, payload).await?;
        Ok(())
    }

    async fn request_confirmation(
        &self,
        booking_id: &str,
        attempt: u32,
    ) -> Result<Option<ConfirmationEvent>, SubmissionError> {
        let Some(url) = self.confirmation_url.as_deref() else {
            return Ok(None);
        };

        let body = json!({
            "bookingId": booking_id,
            "action": "request_confirmation",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "attempt": attempt,
        });

        let response = self.post_json(url, &body).await?;
        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        if data.get("confirmed").and_then(|v| v.as_bool()) != Some(true) {
            return Ok(None);
        }

        // A malformed eager payload is not fatal; the push channel can still
        // deliver the confirmation later.
        match serde_json::from_value::<ConfirmationEvent>(data) {
            Ok(event) => Ok(Some(event)),
            Err(e) => {
                tracing::warn!(booking_id = %booking_id, error = %e, "discarding malformed eager confirmation");
                Ok(None)
            }
        }
    }
}
