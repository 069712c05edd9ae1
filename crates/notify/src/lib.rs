//! Chat delivery for relayed alerts.
//!
//! This crate turns an already rendered [`ChatMessage`] into a post on one or
//! more chat services.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use notify::{ChatMessage, KeybaseChannel, Notifier, NotifyChannel};
//!
//! # async fn run() {
//! let keybase: Arc<dyn NotifyChannel> = Arc::new(KeybaseChannel::new("keybase"));
//! let notifier = Notifier::with_channels(vec![keybase]);
//!
//! let results = notifier
//!     .deliver(&ChatMessage::new("ops", "alerts", "*disk*"))
//!     .await;
//! assert!(results.iter().all(|(_, r)| r.is_ok()));
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for delivery channels
//! - [`KeybaseChannel`] posts through the Keybase CLI chat API
//! - [`SlackChannel`] posts to a Slack incoming webhook
//! - [`Notifier`] dispatches a message to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod message;

pub use channels::keybase::KeybaseChannel;
pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use message::ChatMessage;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-channel outcome of a delivery.
pub type DeliveryResult = (&'static str, Result<(), ChannelError>);

/// Central delivery dispatcher.
///
/// The `Notifier` owns the configured channels and hands each message to
/// every enabled one.
#[derive(Clone)]
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        if channels.is_empty() {
            warn!("No delivery channels configured");
        } else {
            info!(
                channel_count = channels.len(),
                channels = ?channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
                "Delivery channels initialized"
            );
        }

        Self { channels }
    }

    /// Deliver a message to every enabled channel and wait for all of them.
    ///
    /// Channels are tried in order and a failure on one does not stop the
    /// others. Failures are logged here and returned to the caller. The
    /// result is empty when no channel is enabled.
    pub async fn deliver(&self, message: &ChatMessage) -> Vec<DeliveryResult> {
        if self.channels.is_empty() {
            debug!("No channels configured, skipping message");
            return vec![];
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let channel_name = channel.name();

            if !channel.enabled() {
                debug!(channel = channel_name, "Channel disabled, skipping");
                continue;
            }

            let result = channel.send(message).await;
            match &result {
                Ok(()) => {
                    debug!(channel = channel_name, destination = %message.destination(), "Message delivered");
                }
                Err(e) => {
                    error!(
                        channel = channel_name,
                        destination = %message.destination(),
                        error = %e,
                        "Failed to deliver message"
                    );
                }
            }
            results.push((channel_name, result));
        }

        results
    }
}
