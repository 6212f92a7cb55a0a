use serde::Serialize;

use crate::{config::LockMode, correlation::Token};

/// Commands understood by the server.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "command")]
pub enum Command {
    /// Ask the server for its info banner.
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "ACQUIRE", rename_all = "camelCase")]
    Acquire {
        lock_id: String,
        /// Milliseconds the server waits before answering with an acquire timeout.
        timeout: u64,
        mode: LockMode,
    },
    #[serde(rename = "RELEASE", rename_all = "camelCase")]
    Release { lock_id: String },
    /// Release every lock held by this connection.
    #[serde(rename = "RELEASE-ALL")]
    ReleaseAll,
    /// List the locks known to the server.
    #[serde(rename = "SHOW")]
    Show,
    /// Ask the server to end the session.
    #[serde(rename = "CLOSE")]
    Close,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Info => "INFO",
            Command::Acquire { .. } => "ACQUIRE",
            Command::Release { .. } => "RELEASE",
            Command::ReleaseAll => "RELEASE-ALL",
            Command::Show => "SHOW",
            Command::Close => "CLOSE",
        }
    }
}

/// A command stamped with the token of the operation waiting on it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Envelope {
    #[serde(flatten)]
    pub command: Command,
    pub token: Token,
}

impl Envelope {
    pub fn new(command: Command, token: Token) -> Self {
        Self { command, token }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn wire(command: Command) -> Value {
        let envelope = Envelope::new(command, Token::from("t1"));
        serde_json::to_value(envelope).unwrap()
    }

    #[test]
    fn acquire_envelope() {
        let command = Command::Acquire {
            lock_id: "HELLO".to_string(),
            timeout: 2000,
            mode: LockMode::Write,
        };

        assert_eq!(
            wire(command),
            json!({
                "command": "ACQUIRE",
                "lockId": "HELLO",
                "timeout": 2000,
                "mode": "W",
                "token": "t1",
            })
        );
    }

    #[test]
    fn release_envelope() {
        let command = Command::Release {
            lock_id: "HELLO".to_string(),
        };

        assert_eq!(
            wire(command),
            json!({ "command": "RELEASE", "lockId": "HELLO", "token": "t1" })
        );
    }

    #[test]
    fn bare_command_envelopes() {
        let inputs = vec![
            Command::Info,
            Command::ReleaseAll,
            Command::Show,
            Command::Close,
        ];

        for command in inputs {
            let name = command.name();
            assert_eq!(wire(command), json!({ "command": name, "token": "t1" }));
        }
    }
}
