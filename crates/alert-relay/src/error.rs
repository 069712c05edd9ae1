//! Error types for alert-relay.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the subscription table at startup.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The subscription file could not be read
    #[error("Could not read subscriptions file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The subscription file is not a valid subscription table
    #[error("Could not parse subscriptions file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
