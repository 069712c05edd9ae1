//! Alert relay server.
//!
//! Listens for alert webhooks and relays them to Keybase (and optionally
//! Slack) chat.

use std::sync::Arc;

use alert_relay::config::{init_tracing, Cli};
use alert_relay::server::{run_server, ServerState};
use anyhow::{Context, Result};
use clap::Parser;
use notify::{KeybaseChannel, Notifier, NotifyChannel, SlackChannel};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let subscriptions = cli
        .load_subscriptions()
        .context("Failed to load subscriptions")?;
    info!(programs = subscriptions.len(), "Subscriptions ready");

    if !cli.has_delivery_channel() {
        anyhow::bail!(
            "No delivery channels configured: drop --no-keybase or set --slack-webhook-url"
        );
    }

    let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

    if cli.no_keybase {
        info!("Keybase delivery disabled");
    } else {
        let keybase = KeybaseChannel::new(cli.keybase.as_str());
        let username = keybase
            .probe()
            .await
            .with_context(|| format!("Failed to start Keybase chat via {}", keybase.location()))?;
        info!(username = %username, "Keybase chat ready");
        channels.push(Arc::new(keybase));
    }

    if let Some(url) = cli.slack_webhook_url.clone() {
        info!("Slack delivery enabled");
        channels.push(Arc::new(SlackChannel::new(url)));
    }

    let notifier = Notifier::with_channels(channels);
    let state = Arc::new(ServerState::new(subscriptions, notifier, cli.channel.clone()));

    run_server(state, &cli.listen_addr()).await
}
