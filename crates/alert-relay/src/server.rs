//! HTTP server for inbound alert webhooks.
//!
//! Provides:
//! - `POST` on any path: decode an alert, render it and deliver it to chat
//! - `GET /health`: liveness check

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use notify::{ChatMessage, Notifier};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::alert::Alert;
use crate::render::render_message;
use crate::subscriptions::{Subscriptions, Username};

/// Server state shared across handlers.
pub struct ServerState {
    /// Subscription table, read-only after startup
    subscriptions: Subscriptions,
    /// Delivery channels
    notifier: Notifier,
    /// Channel (team topic) every alert is posted to
    channel: String,
}

impl ServerState {
    /// Create a new server state.
    pub fn new(subscriptions: Subscriptions, notifier: Notifier, channel: impl Into<String>) -> Self {
        Self {
            subscriptions,
            notifier,
            channel: channel.into(),
        }
    }

    /// The subscription table alerts are resolved against.
    #[must_use]
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Resolve subscribers and build the outbound chat message for `alert`.
    #[must_use]
    pub fn message_for<'a>(&'a self, alert: &Alert) -> (ChatMessage, Vec<&'a Username>) {
        let subscribers = self.subscriptions.subscribers(alert);
        let body = render_message(alert, &subscribers);
        (
            ChatMessage::new(alert.team.clone(), self.channel.clone(), body),
            subscribers,
        )
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", post(alert_handler))
        .route("/{*path}", post(alert_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until interrupted.
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the address.
pub async fn run_server(state: Arc<ServerState>, addr: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Alert relay listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Alert relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        }
    }
}

/// Error reported when an alert reaches no delivery channel at all.
const NO_CHANNELS: &str = "no delivery channel enabled";

// ============================================================================
// Request/Response types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Response to an alert webhook.
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    /// Outcome
    pub status: ResponseStatus,
    /// Users mentioned in the message
    pub mentions: Vec<String>,
    /// Channels the message was delivered through
    pub delivered: Vec<&'static str>,
    /// Delivery or decode errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Response status.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Every enabled channel accepted the message
    Delivered,
    /// The body was not an alert document
    Rejected,
    /// At least one channel failed, or none was available
    Failed,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Alert webhook handler.
///
/// The body is decoded regardless of content type, since alert senders are
/// inconsistent about setting it.
async fn alert_handler(State(state): State<Arc<ServerState>>, body: Bytes) -> impl IntoResponse {
    let alert = match Alert::from_slice(&body) {
        Ok(alert) => alert,
        Err(e) => {
            warn!(error = %e, "Failed to decode alert JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(RelayResponse {
                    status: ResponseStatus::Rejected,
                    mentions: vec![],
                    delivered: vec![],
                    errors: vec![format!("invalid alert document: {e}")],
                }),
            );
        }
    };

    let (message, subscribers) = state.message_for(&alert);
    let mentions: Vec<String> = subscribers.iter().map(ToString::to_string).collect();

    info!(
        team = %alert.team,
        alert_type = %alert.alert_type,
        program = %alert.program(),
        severity = %alert.severity(),
        host = %alert.host,
        mentions = mentions.len(),
        "Relaying alert"
    );

    let mut delivered = vec![];
    let mut errors = vec![];
    for (channel, result) in state.notifier.deliver(&message).await {
        match result {
            Ok(()) => delivered.push(channel),
            Err(e) => errors.push(format!("{channel}: {e}")),
        }
    }

    if delivered.is_empty() && errors.is_empty() {
        warn!(team = %alert.team, "No delivery channel enabled, alert dropped");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RelayResponse {
                status: ResponseStatus::Failed,
                mentions,
                delivered,
                errors: vec![NO_CHANNELS.to_string()],
            }),
        );
    }

    if errors.is_empty() {
        (
            StatusCode::OK,
            Json(RelayResponse {
                status: ResponseStatus::Delivered,
                mentions,
                delivered,
                errors,
            }),
        )
    } else {
        (
            StatusCode::BAD_GATEWAY,
            Json(RelayResponse {
                status: ResponseStatus::Failed,
                mentions,
                delivered,
                errors,
            }),
        )
    }
}
