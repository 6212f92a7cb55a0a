//! Commands typed into the interactive shell.
//!
//! This module defines [`ShellCommand`], the parsed form of one line of user input, and
//! the rules for turning raw text into it. The shell hands parsed commands to the
//! [`cli`](crate::cli) module, which issues them on a [`LockClient`](crate::LockClient)
//! and waits for the server's answer.
//!
//! # Overview
//! Supported input:
//!
//! - `info`: ask the server for its info banner.
//! - `acquire <lock> [timeout_ms] [r|w]`: acquire a lock, optionally overriding the
//!   configured timeout and mode.
//! - `release <lock>`: release one lock.
//! - `release-all`: release every lock held by this connection.
//! - `show`: list the server's locks.
//! - `.exit`: close the connection and leave the shell.
//!
//! # Example
//! ```rust
//! use blockd::ShellCommand;
//!
//! let cmd = ShellCommand::try_from("release HELLO").unwrap();
//! assert_eq!(cmd, ShellCommand::Release { lock_id: "HELLO".to_string() });
//! ```
use std::time::Duration;

use thiserror::Error;

use crate::LockMode;

/// List of possible error that a command can throw.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("invalid '{command}' command, {reason}")]
    InvalidCommandArguments { command: String, reason: String },

    #[error("no command provided")]
    Empty,
}

/// A request typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Info,
    Acquire {
        lock_id: String,
        timeout: Option<Duration>,
        mode: Option<LockMode>,
    },
    Release {
        lock_id: String,
    },
    ReleaseAll,
    Show,
    /// Close the connection and terminate the shell.
    Exit,
}

impl TryFrom<&str> for ShellCommand {
    type Error = CommandError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parts = value.split_whitespace().collect::<Vec<&str>>();
        let Some((name, args)) = parts.split_first() else {
            return Err(CommandError::Empty);
        };

        match name.to_lowercase().as_str() {
            ".exit" => Ok(ShellCommand::Exit),
            "info" => Ok(ShellCommand::Info),
            "show" => Ok(ShellCommand::Show),
            "release-all" => Ok(ShellCommand::ReleaseAll),
            "release" => {
                let lock_id = lock_argument("release", args)?;
                Ok(ShellCommand::Release { lock_id })
            }
            "acquire" => {
                let lock_id = lock_argument("acquire", args)?;

                let timeout = args
                    .get(1)
                    .map(|ms| {
                        ms.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                            CommandError::InvalidCommandArguments {
                                command: "acquire".to_string(),
                                reason: "timeout should be a non-negative number of milliseconds."
                                    .to_string(),
                            }
                        })
                    })
                    .transpose()?;

                let mode = args
                    .get(2)
                    .map(|mode| {
                        mode.parse::<LockMode>()
                            .map_err(|e| CommandError::InvalidCommandArguments {
                                command: "acquire".to_string(),
                                reason: e.to_string(),
                            })
                    })
                    .transpose()?;

                Ok(ShellCommand::Acquire {
                    lock_id,
                    timeout,
                    mode,
                })
            }
            _ => Err(CommandError::UnrecognizedCommand(value.trim().to_string())),
        }
    }
}

fn lock_argument(command: &str, args: &[&str]) -> Result<String, CommandError> {
    args.first()
        .map(|lock| lock.to_string())
        .ok_or_else(|| CommandError::InvalidCommandArguments {
            command: command.to_string(),
            reason: format!("requires a lock name. Example: {command} HELLO"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_string() {
        let inputs = vec![
            (".exit", ShellCommand::Exit),
            ("info", ShellCommand::Info),
            ("SHOW", ShellCommand::Show),
            ("release-all", ShellCommand::ReleaseAll),
            (
                "release HELLO",
                ShellCommand::Release {
                    lock_id: "HELLO".to_string(),
                },
            ),
            (
                "acquire HELLO",
                ShellCommand::Acquire {
                    lock_id: "HELLO".to_string(),
                    timeout: None,
                    mode: None,
                },
            ),
            (
                "  acquire HELLO 500 r ",
                ShellCommand::Acquire {
                    lock_id: "HELLO".to_string(),
                    timeout: Some(Duration::from_millis(500)),
                    mode: Some(LockMode::Read),
                },
            ),
        ];

        for (cmd, expected) in inputs {
            let command = ShellCommand::try_from(cmd).unwrap();
            assert_eq!(command, expected);
        }
    }

    #[test]
    fn command_empty() {
        assert_eq!(ShellCommand::try_from("   "), Err(CommandError::Empty));
    }

    #[test]
    #[should_panic(expected = "UnrecognizedCommand(\"unlock X\")")]
    fn command_unrecognized() {
        ShellCommand::try_from("unlock X").unwrap();
    }

    #[test]
    fn command_missing_lock() {
        let err = ShellCommand::try_from("release").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid 'release' command, requires a lock name. Example: release HELLO"
        );
    }

    #[test]
    fn command_bad_acquire_arguments() {
        assert!(matches!(
            ShellCommand::try_from("acquire X soon"),
            Err(CommandError::InvalidCommandArguments { .. })
        ));
        assert!(matches!(
            ShellCommand::try_from("acquire X 10 z"),
            Err(CommandError::InvalidCommandArguments { .. })
        ));
    }
}
