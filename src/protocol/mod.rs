//! Client-server communication protocol.
//!
//! This module defines the wire protocol spoken between a blockd client and the lock
//! server, and the transport abstraction the client writes to and reads from.
//!
//! # Overview
//!
//! Every exchange travels over a single persistent duplex stream. The client sends
//! commands, each stamped with the [`Token`](crate::correlation::Token) of the operation
//! waiting on it; the server answers asynchronously with status messages that echo zero,
//! one or many tokens. Matching those answers to operations is the job of the
//! [`correlation`](crate::correlation) module; this module only moves and decodes bytes.
//!
//! # Wire Format
//!
//! Messages are JSON objects, one per line, in both directions:
//!
//! - Outbound: `{"command": "ACQUIRE", "lockId": "X", "timeout": 2000, "mode": "W", "token": "t1"}`
//! - Inbound: `{"status": "locked", "token": ["t1"], ...payload}`
//!
//! An inbound `token` may be absent, empty, a string or an array. Absent and empty both
//! address the connection itself rather than any command.
//!
//! # Key Components
//!
//! - [`Command`] / [`Envelope`]: outbound requests.
//! - [`InboundMessage`]: decoded server messages and the [`status`] vocabulary.
//! - [`Transport`] / [`Connector`]: abstraction over the byte stream, with a
//!   newline-delimited implementation ([`LineTransport`]) and a TCP connector.
//!
//! # See Also
//!
//! - [`client`](crate::client): drives the transport and dispatches what it reads.
mod request;
mod response;
mod transport;

pub use request::{Command, Envelope};
pub use response::{InboundMessage, normalize_status, status};
pub use transport::{Connector, LineTransport, TcpConnector, Transport, TransportError};
