//! Slack incoming-webhook channel.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::message::ChatMessage;
use crate::NotifyChannel;

/// Fallback delay when Slack rate limits without a `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Slack webhook channel.
///
/// Incoming webhooks are bound to a single workspace, so the message team is
/// only used for logging; the channel name is passed as an override.
pub struct SlackChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a Slack channel with a specific webhook URL.
    #[must_use]
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    /// Format a message as a Slack webhook payload.
    fn format_payload(message: &ChatMessage) -> SlackPayload<'_> {
        SlackPayload {
            text: &message.body,
            channel: (!message.channel.is_empty()).then(|| format!("#{}", message.channel)),
        }
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError> {
        let payload = Self::format_payload(message);

        debug!(channel = "slack", destination = %message.destination(), "Sending message");

        let response = self.client.post(&self.webhook_url).json(&payload).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(channel = "slack", "Message sent successfully");
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(channel = "slack", retry_after_secs, "Slack rate limited request");
            return Err(ChannelError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.unwrap_or_default();

        warn!(
            channel = "slack",
            status = %status,
            body = %body,
            "Slack webhook request failed"
        );

        Err(ChannelError::Api(format!("Slack returned {status}: {body}")))
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}
