//! Program subscriptions and subscriber resolution.
//!
//! The table is loaded once at startup and only ever read afterwards, so it
//! is shared between request handlers behind an `Arc` without locking.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::alert::{null_as_default, Alert};
use crate::error::SubscriptionError;

/// Prefix that turns a username into a chat mention.
pub const MENTION_PREFIX: char = '@';

/// A chat username to mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The username as a chat mention, e.g. `@alice`.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("{MENTION_PREFIX}{}", self.0)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Who to mention for one program's alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Mentioned on every alert for the program.
    #[serde(rename = "All", alias = "all", default, deserialize_with = "null_as_default")]
    pub all: Vec<Username>,

    /// Mentioned only on critical alerts, ahead of `all`.
    #[serde(
        rename = "Critical",
        alias = "critical",
        default,
        deserialize_with = "null_as_default"
    )]
    pub critical: Vec<Username>,
}

/// Subscription table keyed by program name.
///
/// A `null` entry (or a `null` table) decodes as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subscriptions(
    #[serde(deserialize_with = "null_entries_as_empty")] HashMap<String, Subscription>,
);

fn null_entries_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, Subscription>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<HashMap<String, Option<Subscription>>> =
        Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|(program, subscription)| (program, subscription.unwrap_or_default()))
        .collect())
}

impl Subscriptions {
    /// Parse a subscription table from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load the subscription table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SubscriptionError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SubscriptionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let subscriptions = Self::from_json(&raw).map_err(|source| SubscriptionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            path = %path.display(),
            programs = subscriptions.len(),
            "Loaded subscriptions"
        );
        Ok(subscriptions)
    }

    /// Subscription for `program`, if any.
    #[must_use]
    pub fn get(&self, program: &str) -> Option<&Subscription> {
        self.0.get(program)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Users to mention for `alert`, in mention order.
    ///
    /// Critical alerts get the program's `Critical` list first, then every
    /// alert gets its `All` list. Duplicates are kept.
    #[must_use]
    pub fn subscribers(&self, alert: &Alert) -> Vec<&Username> {
        let Some(subscription) = self.get(alert.program()) else {
            return vec![];
        };

        let mut subscribers = Vec::with_capacity(subscription.all.len() + subscription.critical.len());
        if alert.is_critical() {
            subscribers.extend(&subscription.critical);
        }
        subscribers.extend(&subscription.all);
        subscribers
    }
}

impl FromIterator<(String, Subscription)> for Subscriptions {
    fn from_iter<I: IntoIterator<Item = (String, Subscription)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolve mentions against an optional table; no table means no mentions.
#[must_use]
pub fn resolve_subscribers<'a>(
    subscriptions: Option<&'a Subscriptions>,
    alert: &Alert,
) -> Vec<&'a Username> {
    subscriptions.map_or_else(Vec::new, |table| table.subscribers(alert))
}
