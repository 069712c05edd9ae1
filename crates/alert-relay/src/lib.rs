//! Alert relay.
//!
//! Receives alert documents over HTTP and posts a formatted message to a team
//! chat channel, mentioning the users subscribed to the alert's program.
//!
//! Per alert the pipeline is:
//!
//! - [`alert`]: decode the document and reconcile primary/legacy field names
//! - [`subscriptions`]: pick who to mention from the startup-loaded table
//! - [`render`]: build the message body
//! - [`server`]: hand the message to the configured [`notify`] channels
//!
//! Everything before delivery is pure and shares nothing but the read-only
//! subscription table.

pub mod alert;
pub mod config;
pub mod error;
pub mod render;
pub mod server;
pub mod subscriptions;

pub use alert::Alert;
pub use error::SubscriptionError;
pub use render::{render_mentions, render_message};
pub use server::{build_router, run_server, ServerState};
pub use subscriptions::{resolve_subscribers, Subscription, Subscriptions, Username};
