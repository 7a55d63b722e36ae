// frontend/src/panel/commands.rs
//
// The three outbound device commands. The panel fires them and moves on:
// nothing in the pipeline waits for or reacts to their outcome.

use katapult_shared::{INITIATE_PATH, InitiateBody, RESET_PATH, TURN_PATH};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use super::angle_input::{ANGLE_MAX, ANGLE_MIN};
use super::config::base_http;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("device answered {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    TurnServo,
    InitiateShot { angle: i32 },
}

impl Command {
    pub fn path(&self) -> &'static str {
        match self {
            Command::Reset => RESET_PATH,
            Command::TurnServo => TURN_PATH,
            Command::InitiateShot { .. } => INITIATE_PATH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    base: Url,
}

impl CommandClient {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: base_http(base_url)?,
        })
    }

    pub fn url_for(&self, cmd: Command) -> Url {
        let mut url = self.base.clone();
        url.set_path(cmd.path());
        url
    }

    pub async fn send(&self, cmd: Command) -> Result<(), CommandError> {
        let req = self.http.post(self.url_for(cmd));
        let req = match cmd {
            Command::InitiateShot { angle } => req.json(&InitiateBody {
                angle: angle.clamp(ANGLE_MIN as i32, ANGLE_MAX as i32),
            }),
            _ => req,
        };

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(CommandError::Status(resp.status()));
        }
        debug!("{cmd:?} -> {}", resp.status());
        Ok(())
    }

    pub async fn send_reset(&self) -> Result<(), CommandError> {
        self.send(Command::Reset).await
    }

    pub async fn send_turn_servo(&self) -> Result<(), CommandError> {
        self.send(Command::TurnServo).await
    }

    pub async fn send_initiate_shot(&self, angle: i32) -> Result<(), CommandError> {
        self.send(Command::InitiateShot { angle }).await
    }

    /// Fire-and-forget: failures are only logged. The handle is returned for
    /// callers (tests, shutdown) that want to wait anyway.
    pub fn fire(&self, cmd: Command) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.send(cmd).await {
                warn!("{cmd:?} failed: {e}");
            }
        })
    }

    pub fn reset(&self) {
        self.fire(Command::Reset);
    }

    pub fn turn_servo(&self) {
        self.fire(Command::TurnServo);
    }

    pub fn initiate_shot(&self, angle: i32) {
        self.fire(Command::InitiateShot { angle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_map_to_device_paths() {
        assert_eq!(Command::Reset.path(), "/api/reset");
        assert_eq!(Command::TurnServo.path(), "/api/trigger/turn");
        assert_eq!(
            Command::InitiateShot { angle: 10 }.path(),
            "/api/trigger/initiate"
        );
    }

    #[test]
    fn client_uses_http_form_of_base() {
        let client = CommandClient::new("ws://dev:3000/x?tab=1").expect("valid base");
        assert_eq!(
            client.url_for(Command::Reset).as_str(),
            "http://dev:3000/api/reset"
        );
        assert_eq!(
            client.url_for(Command::InitiateShot { angle: 1 }).as_str(),
            "http://dev:3000/api/trigger/initiate"
        );
    }

    #[tokio::test]
    async fn unreachable_device_is_an_error_not_a_panic() {
        let client = CommandClient::new("http://127.0.0.1:9").expect("valid base");
        assert!(matches!(
            client.send_reset().await,
            Err(CommandError::Http(_))
        ));
        // Fire-and-forget swallows the same failure.
        client.fire(Command::TurnServo).await.expect("task completes");
    }
}
