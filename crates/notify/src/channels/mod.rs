//! Chat channel implementations.

pub mod keybase;
pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::ChatMessage;

/// Trait for chat delivery channels (Keybase, Slack, etc.).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver a message through this channel.
    async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError>;
}
