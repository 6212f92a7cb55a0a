//! Client configuration.
//!
//! [`ClientConfig`] collects the values a [`LockClient`](crate::client::LockClient) needs
//! at construction time: where the server lives and which defaults to apply to `acquire`
//! requests that don't specify their own timeout or lock mode.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use blockd::{ClientConfig, LockMode};
//!
//! let config = ClientConfig::default()
//!     .with_host("10.0.0.4")
//!     .with_default_timeout(Duration::from_millis(500))
//!     .with_default_lock_mode(LockMode::Read);
//!
//! assert_eq!(config.port, 11311);
//! assert_eq!(config.endpoint(), "10.0.0.4:11311");
//! ```
use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11311;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown lock mode '{0}', expected one of: r, w, read, write")]
pub struct LockModeError(String);

/// Lock mode requested from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockMode {
    /// Shared reader lock.
    #[serde(rename = "R")]
    Read,
    /// Exclusive writer lock.
    #[default]
    #[serde(rename = "W")]
    Write,
}

impl LockMode {
    /// Single character code used on the wire.
    pub fn code(&self) -> char {
        match self {
            LockMode::Read => 'R',
            LockMode::Write => 'W',
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for LockMode {
    type Err = LockModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "r" | "read" => Ok(LockMode::Read),
            "w" | "write" => Ok(LockMode::Write),
            other => Err(LockModeError(other.to_string())),
        }
    }
}

/// Settings applied once when a client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Timeout sent with `acquire` requests that don't carry their own.
    pub default_timeout: Duration,
    /// Mode sent with `acquire` requests that don't carry their own.
    pub default_lock_mode: LockMode,
    /// Whether readers may starve writers on reader/writer locks. Enforced by the server.
    pub reader_greed: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_timeout: DEFAULT_TIMEOUT,
            default_lock_mode: LockMode::default(),
            reader_greed: false,
        }
    }
}

impl ClientConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_lock_mode(mut self, mode: LockMode) -> Self {
        self.default_lock_mode = mode;
        self
    }

    pub fn with_reader_greed(mut self, greedy: bool) -> Self {
        self.reader_greed = greedy;
        self
    }

    /// `host:port` string handed to the connector.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 11311);
        assert_eq!(config.default_timeout, Duration::from_millis(2000));
        assert_eq!(config.default_lock_mode, LockMode::Write);
        assert!(!config.reader_greed);
    }

    #[test]
    fn config_overrides() {
        let config = ClientConfig::default()
            .with_port(9000)
            .with_reader_greed(true)
            .with_default_lock_mode(LockMode::Read);

        assert_eq!(config.endpoint(), "localhost:9000");
        assert!(config.reader_greed);
        assert_eq!(config.default_lock_mode, LockMode::Read);
    }

    #[test]
    fn lock_mode_from_string() {
        let inputs = vec![
            ("r", LockMode::Read),
            ("READ", LockMode::Read),
            ("w", LockMode::Write),
            (" Write ", LockMode::Write),
        ];

        for (input, expected) in inputs {
            assert_eq!(input.parse::<LockMode>().unwrap(), expected);
        }
    }

    #[test]
    #[should_panic(expected = "unknown lock mode 'x'")]
    fn lock_mode_unknown() {
        "x".parse::<LockMode>().map_err(|e| e.to_string()).unwrap();
    }

    #[test]
    fn lock_mode_wire_code() {
        assert_eq!(serde_json::to_string(&LockMode::Read).unwrap(), "\"R\"");
        assert_eq!(LockMode::Write.to_string(), "W");
    }
}
