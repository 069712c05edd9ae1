//! Keybase chat channel.
//!
//! Messages are delivered through the Keybase CLI's JSON chat API
//! (`keybase chat api -m <json>`), one child process per message. The CLI
//! must be installed and logged in as the bot user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::message::ChatMessage;
use crate::NotifyChannel;

/// Default Keybase executable, resolved through `PATH`.
pub const DEFAULT_KEYBASE_LOCATION: &str = "keybase";

/// Keybase chat channel backed by the `keybase` CLI.
pub struct KeybaseChannel {
    location: String,
}

impl KeybaseChannel {
    /// Create a channel that runs the Keybase CLI at `location`.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// The executable this channel invokes.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Check that the CLI runs and is logged in, returning the username.
    pub async fn probe(&self) -> Result<String, ChannelError> {
        let stdout = self.run(&["status", "--json"]).await?;
        let status: StatusResponse = serde_json::from_slice(&stdout)?;

        if status.username.is_empty() {
            return Err(ChannelError::NotConfigured(format!(
                "{} is not logged in",
                self.location
            )));
        }

        debug!(channel = "keybase", username = %status.username, "Keybase CLI ready");
        Ok(status.username)
    }

    /// Build the chat API request for a message.
    fn format_request(message: &ChatMessage) -> SendRequest<'_> {
        SendRequest {
            method: "send",
            params: SendParams {
                options: SendOptions {
                    channel: ChannelSpec {
                        name: &message.team,
                        members_type: "team",
                        topic_name: &message.channel,
                    },
                    message: MessageBody {
                        body: &message.body,
                    },
                },
            },
        }
    }

    /// Interpret the chat API's stdout.
    fn check_response(stdout: &[u8]) -> Result<(), ChannelError> {
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let response: ApiResponse = serde_json::from_slice(stdout)?;
        match response.error {
            Some(error) => Err(ChannelError::Api(format!(
                "{} (code {})",
                error.message, error.code
            ))),
            None => Ok(()),
        }
    }

    /// Run the CLI with `args`, returning stdout on a zero exit status.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ChannelError> {
        let output = Command::new(&self.location).args(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ChannelError::CommandFailed {
                command: format!("{} {}", self.location, args.first().unwrap_or(&"")),
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl NotifyChannel for KeybaseChannel {
    fn name(&self) -> &'static str {
        "keybase"
    }

    fn enabled(&self) -> bool {
        !self.location.is_empty()
    }

    async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError> {
        if message.team.is_empty() {
            return Err(ChannelError::NotConfigured("alert has no team".to_string()));
        }

        let request = serde_json::to_string(&Self::format_request(message))?;

        debug!(channel = "keybase", destination = %message.destination(), "Sending message");

        let stdout = self.run(&["chat", "api", "-m", &request]).await?;
        if let Err(e) = Self::check_response(&stdout) {
            warn!(
                channel = "keybase",
                destination = %message.destination(),
                error = %e,
                "Keybase chat API rejected message"
            );
            return Err(e);
        }

        debug!(channel = "keybase", "Message sent successfully");
        Ok(())
    }
}

// =============================================================================
// Keybase chat API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    method: &'static str,
    params: SendParams<'a>,
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    options: SendOptions<'a>,
}

#[derive(Debug, Serialize)]
struct SendOptions<'a> {
    channel: ChannelSpec<'a>,
    message: MessageBody<'a>,
}

#[derive(Debug, Serialize)]
struct ChannelSpec<'a> {
    name: &'a str,
    members_type: &'static str,
    topic_name: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(rename = "Username", default)]
    username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let message = ChatMessage::new("t1", "alerts", "*disk*");
        let request = serde_json::to_value(KeybaseChannel::format_request(&message)).unwrap();
        assert_eq!(
            request,
            serde_json::json!({
                "method": "send",
                "params": {
                    "options": {
                        "channel": {
                            "name": "t1",
                            "members_type": "team",
                            "topic_name": "alerts"
                        },
                        "message": { "body": "*disk*" }
                    }
                }
            })
        );
    }

    #[test]
    fn test_check_response() {
        assert!(KeybaseChannel::check_response(b"").is_ok());
        assert!(KeybaseChannel::check_response(b"\n").is_ok());
        assert!(
            KeybaseChannel::check_response(br#"{"result":{"message":"message sent"}}"#).is_ok()
        );

        let err = KeybaseChannel::check_response(
            br#"{"error":{"code":2500,"message":"no such team"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Chat API error: no such team (code 2500)");

        assert!(matches!(
            KeybaseChannel::check_response(b"not json"),
            Err(ChannelError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_send_requires_team() {
        let channel = KeybaseChannel::new(DEFAULT_KEYBASE_LOCATION);
        let err = channel
            .send(&ChatMessage::new("", "alerts", "body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let channel = KeybaseChannel::new("/nonexistent/keybase-cli");
        let err = channel.probe().await.unwrap_err();
        assert!(matches!(err, ChannelError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_round_trip() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let write_script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        };

        let ok = write_script(
            "keybase-ok",
            r#"if [ "$1" = "status" ]; then echo '{"Username":"alertbot"}'; else echo '{"result":{"message":"message sent"}}'; fi"#,
        );
        let logged_out = write_script("keybase-logged-out", r#"echo '{"Username":""}'"#);
        let failing = write_script("keybase-failing", "echo boom >&2; exit 3");

        let channel = KeybaseChannel::new(ok);
        assert_eq!(channel.probe().await.unwrap(), "alertbot");
        channel
            .send(&ChatMessage::new("t1", "alerts", "body"))
            .await
            .unwrap();

        let err = KeybaseChannel::new(logged_out).probe().await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));

        let err = KeybaseChannel::new(failing)
            .send(&ChatMessage::new("t1", "alerts", "body"))
            .await
            .unwrap_err();
        match err {
            ChannelError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
