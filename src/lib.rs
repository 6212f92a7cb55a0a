pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod correlation;
pub mod protocol;

pub use cli::{PromptError, execute, prompt};
pub use client::{ClientError, ClientHandle, LockClient};
pub use command::{CommandError, ShellCommand};
pub use config::{ClientConfig, LockMode};
pub use correlation::{Fired, Operation, Registry, Token};
