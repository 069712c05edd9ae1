//! The unit of chat delivery.

use serde::{Deserialize, Serialize};

/// A rendered message addressed to a channel inside a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Team (or workspace) the message is posted to.
    pub team: String,
    /// Channel/topic name inside the team.
    pub channel: String,
    /// Message body, already formatted for the chat service.
    pub body: String,
}

impl ChatMessage {
    /// Build a message for `channel` in `team`.
    #[must_use]
    pub fn new(
        team: impl Into<String>,
        channel: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            team: team.into(),
            channel: channel.into(),
            body: body.into(),
        }
    }

    /// Short description used in log fields.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}#{}", self.team, self.channel)
    }
}
