use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::correlation::Token;

/// Status codes consumed by the client, in normalized form.
pub mod status {
    pub const HANDSHAKE_OK: &str = "HANDSHAKE-OK";
    pub const INFO_OK: &str = "INFO-OK";
    pub const LOCK_PENDING: &str = "LOCK-PENDING";
    pub const LOCKED: &str = "LOCKED";
    pub const ACQUIRE_TIMEOUT: &str = "ACQUIRE-TIMEOUT";
    pub const RELEASED: &str = "RELEASED";
    pub const NO_LOCK_TO_RELEASE: &str = "NO-LOCK-TO-RELEASE";
    pub const NO_LOCKS_TO_RELEASE: &str = "NO-LOCKS-TO-RELEASE";
    pub const SHOW_RESULT: &str = "SHOW-RESULT";
    pub const CLOSE_OK: &str = "CLOSE-OK";
}

/// Canonical form of a status code: upper case, `_` folded into `-`.
pub fn normalize_status(status: &str) -> String {
    status.trim().to_uppercase().replace('_', "-")
}

/// A message pushed by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub status: String,
    /// Operations this message resolves. Empty means the connection itself.
    #[serde(
        default,
        rename = "token",
        alias = "nonce",
        deserialize_with = "deserialize_tokens"
    )]
    pub tokens: Vec<Token>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl InboundMessage {
    pub fn new(status: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self {
            status: status.into(),
            tokens,
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Text of an info reply.
    pub fn quote(&self) -> Option<&str> {
        self.field("quote").and_then(Value::as_str)
    }

    /// Lock list of a show reply.
    pub fn locks(&self) -> Option<&[Value]> {
        self.field("locks")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    pub fn is_connection_level(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenField {
    One(Token),
    Many(Vec<Token>),
}

fn deserialize_tokens<'de, D>(deserializer: D) -> Result<Vec<Token>, D::Error>
where
    D: Deserializer<'de>,
{
    let tokens = match Option::<TokenField>::deserialize(deserializer)? {
        None => vec![],
        Some(TokenField::One(token)) => vec![token],
        Some(TokenField::Many(tokens)) => tokens,
    };

    Ok(tokens.into_iter().filter(|t| !t.is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> InboundMessage {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn normalize_status_case_and_separator() {
        assert_eq!(normalize_status("lock-pending"), status::LOCK_PENDING);
        assert_eq!(normalize_status("LOCK_PENDING"), status::LOCK_PENDING);
        assert_eq!(normalize_status(" Close-Ok "), status::CLOSE_OK);
    }

    #[test]
    fn message_without_token() {
        let message = decode(r#"{"status":"handshake-ok"}"#);

        assert!(message.is_connection_level());
        assert!(message.payload.is_empty());
    }

    #[test]
    fn message_with_empty_token() {
        assert!(decode(r#"{"status":"handshake-ok","token":""}"#).is_connection_level());
        assert!(decode(r#"{"status":"handshake-ok","token":[]}"#).is_connection_level());
        assert!(decode(r#"{"status":"handshake-ok","token":null}"#).is_connection_level());
    }

    #[test]
    fn message_with_single_token() {
        let message = decode(r#"{"status":"locked","token":"t1"}"#);
        assert_eq!(message.tokens, vec![Token::from("t1")]);
    }

    #[test]
    fn message_with_token_list() {
        let message = decode(r#"{"status":"released","token":["t1","t2","t3"]}"#);
        assert_eq!(
            message.tokens,
            vec![Token::from("t1"), Token::from("t2"), Token::from("t3")]
        );
    }

    #[test]
    fn message_with_legacy_nonce_key() {
        let message = decode(r#"{"status":"locked","nonce":["t9"]}"#);
        assert_eq!(message.tokens, vec![Token::from("t9")]);
    }

    #[test]
    fn message_payload_fields() {
        let message = decode(
            r#"{"status":"info-ok","token":["t1"],"quote":"I have the power","locks":[{"lockId":"X"}]}"#,
        );

        assert_eq!(message.quote(), Some("I have the power"));
        assert_eq!(message.locks().map(<[Value]>::len), Some(1));
        assert!(message.field("token").is_none());
    }

    #[test]
    fn message_without_status_is_rejected() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"token":"t1"}"#).is_err());
    }
}
