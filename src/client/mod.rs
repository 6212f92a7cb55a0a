//! Lock client and inbound message dispatcher.
//!
//! [`LockClient`] owns the connection to a blockd server and the [`Registry`] of
//! operations it has issued. Commands are built, stamped with a fresh token, written to
//! the transport and handed back to the caller as an [`Operation`] to hang handlers on.
//! Server messages come back through [`LockClient::poll`] (or [`LockClient::handle_line`]
//! when the caller owns the read loop) and are routed by token:
//!
//! - no token: the connection-level handshake operation created by [`LockClient::open`],
//! - one or more tokens: each token is dispatched on its own, so a single broadcast can
//!   resolve several waiting operations.
//!
//! Everything runs on the caller's thread. The client never blocks outside the
//! transport's `receive`, and it releases every internal borrow before running user
//! handlers, so a handler may issue further commands through its [`ClientHandle`].
//!
//! # Example
//! ```rust,no_run
//! use blockd::{ClientConfig, LockClient};
//!
//! let client = LockClient::new(ClientConfig::default());
//! client.open().unwrap().then(|_, owner| {
//!     let Some(client) = owner.client() else { return };
//!     client.acquire("HELLO").then(|_, _| println!("locked HELLO"));
//! });
//! client.run().unwrap();
//! ```
mod commands;
mod error;


use std::{
    any::Any,
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    rc::{Rc, Weak},
};

use log::{debug, error, info, warn};

use crate::{
    config::ClientConfig,
    correlation::{
        Fired, Operation, PostCallback, Registry, TokenGenerator, UuidTokens, handler,
    },
    protocol::{
        Command, Connector, Envelope, InboundMessage, TcpConnector, Transport, TransportError,
        status,
    },
};

pub use error::ClientError;

type ErrorChannel = Box<dyn FnMut(&ClientError)>;

struct Shared {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    registry: Registry<ClientHandle>,
    connection: RefCell<Option<Box<dyn Transport>>>,
    handshake: RefCell<Option<Operation<ClientHandle>>>,
    errors: RefCell<Option<ErrorChannel>>,
}

/// Client for a single blockd connection.
///
/// Clones share the same connection and operations.
#[derive(Clone)]
pub struct LockClient {
    shared: Rc<Shared>,
}

/// Owner value handed to every handler of a client's operations.
///
/// Holds the client weakly so that operations never keep their client alive.
#[derive(Clone)]
pub struct ClientHandle(Weak<Shared>);

impl ClientHandle {
    /// The client that issued the operation, while it is still around.
    pub fn client(&self) -> Option<LockClient> {
        self.0.upgrade().map(|shared| LockClient { shared })
    }
}

impl LockClient {
    /// Client connecting over TCP with random tokens.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(config, TcpConnector, UuidTokens)
    }

    pub fn with_parts(
        config: ClientConfig,
        connector: impl Connector + 'static,
        tokens: impl TokenGenerator + 'static,
    ) -> Self {
        let shared = Shared {
            config,
            connector: Box::new(connector),
            registry: Registry::with_tokens(tokens),
            connection: RefCell::new(None),
            handshake: RefCell::new(None),
            errors: RefCell::new(None),
        };
        Self {
            shared: Rc::new(shared),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &Registry<ClientHandle> {
        &self.shared.registry
    }

    pub fn handle(&self) -> ClientHandle {
        ClientHandle(Rc::downgrade(&self.shared))
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connection.borrow().is_some()
    }

    /// Connection-level operation of the current connection.
    pub fn handshake(&self) -> Option<Operation<ClientHandle>> {
        self.shared.handshake.borrow().clone()
    }

    /// Route decode failures, panicking handlers and other asynchronous errors to
    /// `channel`.
    ///
    /// Without a channel they are only logged.
    pub fn on_error<F>(&self, channel: F)
    where
        F: FnMut(&ClientError) + 'static,
    {
        *self.shared.errors.borrow_mut() = Some(Box::new(channel));
    }

    /// Connect to the configured server.
    ///
    /// Returns the connection-level operation, which fires `then` on the server's
    /// handshake. Opening an already open client returns the existing operation.
    pub fn open(&self) -> Result<Operation<ClientHandle>, ClientError> {
        let endpoint = self.shared.config.endpoint();

        if self.is_connected() {
            if let Some(handshake) = self.handshake() {
                debug!("already connected to {endpoint}");
                return Ok(handshake);
            }
        }

        info!("opening connection to blockd server at {endpoint}");
        let transport = self
            .shared
            .connector
            .connect(&endpoint)
            .map_err(|source| ClientError::Connect { endpoint, source })?;
        *self.shared.connection.borrow_mut() = Some(transport);

        let handshake = self.create().define_for_status(
            status::HANDSHAKE_OK,
            handler::THEN,
            false,
            None,
        );
        *self.shared.handshake.borrow_mut() = Some(handshake.clone());
        Ok(handshake)
    }

    /// Ask the server to end the session.
    ///
    /// Once the server confirms, the caller's `then` runs first; the connection is
    /// ended and forgotten afterwards.
    ///
    /// The teardown is tied to `then`: without a `then` callback the confirmation is
    /// ignored and the connection stays open.
    pub fn close(&self) -> Operation<ClientHandle> {
        info!("closing connection to server");

        let disconnect: PostCallback<ClientHandle> =
            Rc::new(|_: &InboundMessage, owner: &ClientHandle| {
                if let Some(client) = owner.client() {
                    client.disconnect();
                }
            });
        let op = self.create().define_for_status(
            status::CLOSE_OK,
            handler::THEN,
            true,
            Some(disconnect),
        );
        self.send(&op, Command::Close);
        op
    }

    /// Read one message from the connection and dispatch it.
    ///
    /// Returns `false` once there is no connection left to read from.
    pub fn poll(&self) -> Result<bool, ClientError> {
        let received = {
            let mut connection = self.shared.connection.borrow_mut();
            let Some(transport) = connection.as_mut() else {
                return Ok(false);
            };
            match transport.receive() {
                Err(e @ TransportError::Encoding(_)) => {
                    drop(connection);
                    self.report(ClientError::Transport(e));
                    return Ok(true);
                }
                received => received?,
            }
        };

        match received {
            Some(line) => {
                self.handle_line(&line);
                Ok(true)
            }
            None => {
                info!("connection closed from server-side");
                self.forget_connection();
                Ok(false)
            }
        }
    }

    /// Poll until the connection is gone.
    pub fn run(&self) -> Result<(), ClientError> {
        while self.poll()? {}
        Ok(())
    }

    /// Decode one line from the server and dispatch it.
    ///
    /// Blank lines are skipped; malformed ones are reported to the error channel.
    pub fn handle_line(&self, line: &str) -> Vec<Fired> {
        let line = line.trim();
        if line.is_empty() {
            return vec![];
        }

        debug!("blockd data received: {line}");
        match serde_json::from_str::<InboundMessage>(line) {
            Ok(message) => self.dispatch(&message),
            Err(source) => {
                self.report(ClientError::Decode {
                    line: line.to_string(),
                    source,
                });
                vec![]
            }
        }
    }

    /// Route a decoded message to the operations it names, one result per target.
    pub fn dispatch(&self, message: &InboundMessage) -> Vec<Fired> {
        if message.is_connection_level() {
            let Some(handshake) = self.handshake() else {
                warn!(
                    "no connection-level operation for status '{}'",
                    message.status
                );
                return vec![Fired::UnknownToken];
            };
            debug!("firing connection operation for status '{}'", message.status);
            let fired = self.guarded("the connection operation", || {
                handshake.fire_for_status(&message.status, message)
            });
            return vec![fired];
        }

        message
            .tokens
            .iter()
            .map(|token| {
                self.guarded(&format!("token {token}"), || {
                    self.shared.registry.dispatch(token, message)
                })
            })
            .collect()
    }

    /// Run one dispatch, turning a panicking handler into a report on the error channel.
    fn guarded(&self, target: &str, fire: impl FnOnce() -> Fired) -> Fired {
        match panic::catch_unwind(AssertUnwindSafe(fire)) {
            Ok(fired) => fired,
            Err(payload) => {
                self.report(ClientError::Handler {
                    target: target.to_string(),
                    reason: panic_reason(payload.as_ref()),
                });
                Fired::Failed
            }
        }
    }

    fn create(&self) -> Operation<ClientHandle> {
        self.shared.registry.create(self.handle())
    }

    /// Stamp `command` with the token of `op` and write it out.
    ///
    /// Write failures are logged and swallowed; `op` then simply never resolves.
    fn send(&self, op: &Operation<ClientHandle>, command: Command) {
        let envelope = Envelope::new(command, op.token());
        let mut connection = self.shared.connection.borrow_mut();

        let Some(transport) = connection.as_mut() else {
            warn!(
                "error writing {} to socket: not connected",
                envelope.command.name()
            );
            return;
        };

        if let Err(e) = transport.send_envelope(&envelope) {
            warn!(
                "error writing {} to socket: {e}",
                envelope.command.name()
            );
        }
    }

    fn disconnect(&self) {
        let Some(mut transport) = self.forget_connection() else {
            return;
        };

        if let Err(e) = transport.end() {
            warn!("failed to end connection: {e}");
        }
        info!("closed socket");
    }

    /// Drop the connection reference along with its handshake operation.
    fn forget_connection(&self) -> Option<Box<dyn Transport>> {
        let handshake = self.shared.handshake.borrow_mut().take();
        if let Some(handshake) = handshake {
            self.shared.registry.remove(&handshake.token());
        }
        self.shared.connection.borrow_mut().take()
    }

    fn report(&self, error: ClientError) {
        let channel = self.shared.errors.borrow_mut().take();
        let Some(mut channel) = channel else {
            error!("{error}");
            return;
        };

        channel(&error);

        let mut slot = self.shared.errors.borrow_mut();
        if slot.is_none() {
            *slot = Some(channel);
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        return reason.to_string();
    }
    payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "unknown panic".to_string())
}
