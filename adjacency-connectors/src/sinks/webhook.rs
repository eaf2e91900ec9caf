//! HTTP webhook sink
//!
//! POSTs each notification as JSON to a fixed URL. ureq is blocking, so
//! every attempt runs on tokio's blocking pool.
//!
//! ## Retries
//!
//! | Outcome | Action |
//! |---------|--------|
//! | 2xx | done |
//! | 429, 5xx | retry |
//! | other 4xx | fail at once |
//! | transport error | retry |
//!
//! Attempt `n` (n ≥ 1) waits `100 ms · 2ⁿ` first.

use std::collections::HashMap;
use std::time::Duration;

use adjacency_core::{AdjacencyEvent, Timestamp};
use base64::Engine;
use log::debug;

use crate::payload::event_body;
use crate::{AsyncNotificationSink, ConnectorError, ConnectorResult};

/// Authentication methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    Bearer(String),
    Basic { username: String, password: String },
    /// API key in a custom header
    ApiKey { header: String, value: String },
}

/// Webhook endpoint configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout: Duration,
    pub auth: AuthMethod,
    pub headers: HashMap<String, String>,
    pub max_retries: u32,
    pub user_agent: String,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
            auth: AuthMethod::None,
            headers: HashMap::new(),
            max_retries: 3,
            user_agent: format!("adjacency/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header carrying the credentials, if any
    fn auth_header(&self) -> Option<(String, String)> {
        match &self.auth {
            AuthMethod::None => None,
            AuthMethod::Bearer(token) => Some(("Authorization".into(), format!("Bearer {token}"))),
            AuthMethod::Basic { username, password } => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                Some(("Authorization".into(), format!("Basic {credentials}")))
            }
            AuthMethod::ApiKey { header, value } => Some((header.clone(), value.clone())),
        }
    }
}

/// Whether a status code is worth another attempt
fn is_retryable(status: u16) -> bool {
    status == 429 || status >= 500
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100u64.saturating_mul(1u64 << attempt.min(16)))
}

/// Delivers notifications to an HTTP endpoint
pub struct WebhookSink {
    config: WebhookConfig,
    agent: ureq::Agent,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> ConnectorResult<Self> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(ConnectorError::ConfigError(
                "webhook URL must start with http:// or https://".into(),
            ));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self { config, agent })
    }

    fn build_request(&self) -> ureq::Request {
        let mut request = self
            .agent
            .post(&self.config.url)
            .set("Content-Type", "application/json");

        if let Some((name, value)) = self.config.auth_header() {
            request = request.set(&name, &value);
        }
        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }
        request
    }

    async fn post(&self, body: Vec<u8>) -> ConnectorResult<()> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }

            let request = self.build_request();
            let payload = body.clone();
            let response = tokio::task::spawn_blocking(move || request.send_bytes(&payload))
                .await
                .map_err(|e| ConnectorError::ProtocolError(e.to_string()))?;

            match response {
                Ok(_) => return Ok(()),
                Err(ureq::Error::Status(code, resp)) => {
                    let error = ConnectorError::ProtocolError(format!(
                        "HTTP {}: {}",
                        code,
                        resp.into_string().unwrap_or_default()
                    ));
                    if !is_retryable(code) {
                        return Err(error);
                    }
                    debug!("webhook: attempt {} got {}", attempt + 1, code);
                    last_error = Some(error);
                }
                Err(ureq::Error::Transport(e)) => {
                    debug!("webhook: attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(ConnectorError::ProtocolError(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or(ConnectorError::Timeout))
    }
}

#[async_trait::async_trait]
impl AsyncNotificationSink for WebhookSink {
    async fn deliver(&self, event: &AdjacencyEvent, fired_at: Timestamp) -> ConnectorResult<()> {
        self.post(event_body(event, fired_at)?).await
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = WebhookConfig::new("https://hooks.example.com/adjacency")
            .bearer_token("test-token")
            .timeout_secs(5)
            .max_retries(1)
            .header("X-Source", "hallway");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 1);
        assert!(config.headers.contains_key("X-Source"));
        assert_eq!(
            config.auth_header(),
            Some(("Authorization".into(), "Bearer test-token".into()))
        );
    }

    #[test]
    fn basic_auth_is_base64() {
        let config = WebhookConfig::new("https://hooks.example.com").basic_auth("user", "pass");
        assert_eq!(
            config.auth_header(),
            Some(("Authorization".into(), "Basic dXNlcjpwYXNz".into()))
        );
    }

    #[test]
    fn url_validation() {
        assert!(WebhookSink::new(WebhookConfig::new("not-a-url")).is_err());
        assert!(WebhookSink::new(WebhookConfig::new("https://valid.url")).is_ok());
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable(503));
        assert!(is_retryable(429));
        assert!(!is_retryable(404));
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }
}
