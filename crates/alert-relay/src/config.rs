//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use notify::channels::keybase::DEFAULT_KEYBASE_LOCATION;
use tracing_subscriber::EnvFilter;

use crate::error::SubscriptionError;
use crate::subscriptions::Subscriptions;

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "alert_relay=info,notify=info,tower_http=info";

/// Relay alert webhooks into team chat
#[derive(Debug, Parser)]
#[command(name = "alert-relay")]
#[command(about = "Relay alert webhooks into team chat, mentioning subscribed users")]
#[command(version)]
pub struct Cli {
    /// Keybase executable used to post messages
    #[arg(long, env = "ALERT_RELAY_KEYBASE", default_value = DEFAULT_KEYBASE_LOCATION)]
    pub keybase: String,

    /// Channel (team topic) alerts are posted to
    #[arg(long, env = "ALERT_RELAY_CHANNEL", default_value = "alerts")]
    pub channel: String,

    /// Port to listen on
    #[arg(long, env = "ALERT_RELAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// JSON file mapping program names to subscribers
    #[arg(long, env = "ALERT_RELAY_SUBSCRIPTIONS")]
    pub subscriptions_path: Option<PathBuf>,

    /// Also post to this Slack incoming webhook
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub slack_webhook_url: Option<String>,

    /// Do not post through Keybase
    #[arg(long, env = "ALERT_RELAY_NO_KEYBASE")]
    pub no_keybase: bool,

    /// Log output format
    #[arg(long, env = "ALERT_RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Address the HTTP server binds to.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Whether at least one delivery channel is configured.
    #[must_use]
    pub fn has_delivery_channel(&self) -> bool {
        !self.no_keybase || self.slack_webhook_url.is_some()
    }

    /// Load the subscription table, or an empty one when no file is set.
    pub fn load_subscriptions(&self) -> Result<Subscriptions, SubscriptionError> {
        match self.subscriptions_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Subscriptions::load(path),
            _ => Ok(Subscriptions::default()),
        }
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_explicit_flags() {
        let cli = Cli::try_parse_from([
            "alert-relay",
            "--keybase",
            "/usr/local/bin/keybase",
            "--channel",
            "ops-alerts",
            "--port",
            "9000",
            "--no-keybase",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.keybase, "/usr/local/bin/keybase");
        assert_eq!(cli.channel, "ops-alerts");
        assert_eq!(cli.listen_addr(), "0.0.0.0:9000");
        assert!(cli.no_keybase);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_delivery_channels() {
        let mut cli = Cli::try_parse_from(["alert-relay", "--no-keybase"]).unwrap();
        cli.slack_webhook_url = None;
        assert!(!cli.has_delivery_channel());

        cli.slack_webhook_url = Some("https://hooks.slack.com/services/T/B/X".to_string());
        assert!(cli.has_delivery_channel());

        cli.no_keybase = false;
        cli.slack_webhook_url = None;
        assert!(cli.has_delivery_channel());
    }

    #[test]
    fn test_invalid_port() {
        assert!(Cli::try_parse_from(["alert-relay", "--port", "http"]).is_err());
    }

    #[test]
    fn test_subscriptions_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"df":{{"All":["x"],"Critical":["y"]}}}}"#).unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["alert-relay", "--subscriptions-path", path.as_str()]).unwrap();
        assert_eq!(cli.load_subscriptions().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_subscriptions_file_fails() {
        let cli =
            Cli::try_parse_from(["alert-relay", "--subscriptions-path", "/nonexistent/subs.json"])
                .unwrap();
        assert!(matches!(
            cli.load_subscriptions(),
            Err(SubscriptionError::Read { .. })
        ));
    }
}
