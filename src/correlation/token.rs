use std::{cell::Cell, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier attached to an outbound command and echoed back by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Source of fresh tokens for a [`Registry`](super::Registry).
pub trait TokenGenerator {
    fn generate(&self) -> Token;
}

/// Random v4 UUID tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokens;

impl TokenGenerator for UuidTokens {
    fn generate(&self) -> Token {
        Token(Uuid::new_v4().to_string())
    }
}

/// `t1`, `t2`, ... in issue order. Handy when a test needs to predict tokens.
#[derive(Debug, Default)]
pub struct SequentialTokens {
    next: Cell<u64>,
}

impl TokenGenerator for SequentialTokens {
    fn generate(&self) -> Token {
        let id = self.next.get() + 1;
        self.next.set(id);
        Token(format!("t{id}"))
    }
}
