//! Notification channel for pushing rendered alerts to subscribers.
//!
//! The channel is fire-and-forget per subscriber: one send is one HTTP POST
//! to the notification gateway, and a failure for one subscriber never
//! affects the others.

use serde::Serialize;
use std::future::Future;

/// Default per-send timeout in seconds.
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 5;

/// Channel error types.
#[derive(Debug)]
pub enum ChannelError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Gateway returned an error response
    Server { status: u16, message: String },
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Config(msg) => write!(f, "channel config error: {msg}"),
            ChannelError::Network(msg) => write!(f, "channel network error: {msg}"),
            ChannelError::Server { status, message } => {
                write!(f, "channel server error ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for ChannelError {}

/// Push gateway configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Base URL of the notification gateway, e.g. `http://127.0.0.1:8099`.
    pub base_url: String,
    /// Bearer authentication token.
    pub token: String,
    /// Per-send timeout in seconds.
    pub timeout_secs: u64,
}

impl PushConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
        }
    }

    /// Get the send endpoint URL.
    pub fn send_url(&self) -> String {
        format!("{}/v1/notify", self.base_url.trim_end_matches('/'))
    }
}

/// Sends one rendered message to one subscriber.
pub trait AlertChannel: Send + Sync {
    fn send(
        &self,
        subscriber_id: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// Message body accepted by the notification gateway.
#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    subscriber_id: &'a str,
    text: &'a str,
    sender_id: &'a str,
}

/// HTTP push channel for the notification gateway.
pub struct PushChannel {
    config: PushConfig,
    client: reqwest::Client,
    sender_id: String,
}

impl PushChannel {
    pub fn new(config: PushConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Config(format!("failed to build HTTP client: {e}")))?;

        // Identify this agent instance from hostname + a short random suffix
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let sender_id = format!(
            "ridewatch-{}-{}",
            host,
            &uuid::Uuid::new_v4().to_string()[..8]
        );

        Ok(Self {
            config,
            client,
            sender_id,
        })
    }

    /// Get the agent instance id attached to outgoing messages.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }
}

impl AlertChannel for PushChannel {
    async fn send(&self, subscriber_id: &str, message: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(self.config.send_url())
            .header("Authorization", format!("Bearer {}", self.config.token))
            .json(&PushMessage {
                subscriber_id,
                text: message,
                sender_id: &self.sender_id,
            })
            .send()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ChannelError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
