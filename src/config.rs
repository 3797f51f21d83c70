use std::env;
use std::time::Duration;

/// Shipped default for the confirmation endpoint. A deployment that never
/// replaced it is treated as having no confirmation endpoint at all.
pub const CONFIRMATION_URL_PLACEHOLDER: &str = "https://example.com/your-confirmation-webhook";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub webhook_url: String,
    pub webhook_token: String,
    pub confirmation_url: String,
    pub confirmation_secret: String,
    pub max_retries: u32,
    pub submit_timeout_ms: u64,
    pub retry_backoff_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub confirmation_attempts: u32,
    pub confirmation_poll_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            webhook_url: env::var("WEBHOOK_URL").unwrap_or_default(),
            webhook_token: env::var("WEBHOOK_TOKEN").unwrap_or_default(),
            confirmation_url: env::var("CONFIRMATION_URL")
                .unwrap_or_else(|_| CONFIRMATION_URL_PLACEHOLDER.to_string()),
            confirmation_secret: env::var("CONFIRMATION_SECRET").unwrap_or_default(),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            submit_timeout_ms: env::var("SUBMIT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
            retry_backoff_ms: env::var("RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2_000),
            confirmation_timeout_ms: env::var("CONFIRMATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(45_000),
            confirmation_attempts: env::var("CONFIRMATION_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            confirmation_poll_delay_ms: env::var("CONFIRMATION_POLL_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2_000),
        }
    }

    /// The confirmation endpoint, if one is actually configured. An empty
    /// value or the unreplaced placeholder both count as "not configured".
    pub fn confirmation_endpoint(&self) -> Option<&str> {
        let url = self.confirmation_url.trim();
        if url.is_empty() || url == CONFIRMATION_URL_PLACEHOLDER {
            None
        } else {
            Some(url)
        }
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn confirmation_poll_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_delay_ms)
    }
}
