//! Chat message rendering.

use crate::alert::Alert;
use crate::subscriptions::{resolve_subscribers, Subscriptions, Username};

/// Mentions for `subscribers`, space separated.
#[must_use]
pub fn render_mentions(subscribers: &[&Username]) -> String {
    subscribers
        .iter()
        .map(|username| username.mention())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the chat body for an alert and its resolved subscribers.
///
/// The title is bold and every attribute is a quoted `Label: value` line, in
/// a fixed order ending with the `cc` mention line. Alert content is not
/// escaped.
#[must_use]
pub fn render_message(alert: &Alert, subscribers: &[&Username]) -> String {
    format!(
        "*{}*\n>Severity: {}\n>Program: {}\n>Host: {}\n>Hits: {}\n>Timestamp: {}\n>Message: {}\n>cc: {}",
        alert.alert_type,
        alert.severity(),
        alert.program(),
        alert.host,
        alert.hits,
        alert.timestamp(),
        alert.message,
        render_mentions(subscribers),
    )
}

impl Alert {
    /// Resolve subscribers and render the chat body in one step.
    #[must_use]
    pub fn render(&self, subscriptions: Option<&Subscriptions>) -> String {
        render_message(self, &resolve_subscribers(subscriptions, self))
    }
}
