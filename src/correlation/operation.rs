use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use log::{debug, warn};

use crate::protocol::{InboundMessage, normalize_status};

use super::{
    Token,
    registry::{Entries, Registry},
};

/// Handler names shared between the client's commands and their callers.
pub mod handler {
    pub const THEN: &str = "then";
    pub const PENDING: &str = "pending";
    pub const TIMEOUT: &str = "timeout";
    pub const RELEASED: &str = "released";
    pub const NO_LOCK: &str = "noLock";
    pub const NO_LOCKS: &str = "noLocks";
}

/// Caller-supplied behavior attached to a handler name.
pub type Callback<O> = Box<dyn FnMut(&InboundMessage, &O)>;

/// Behavior run after the caller's callback, before any removal.
pub type PostCallback<O> = Rc<dyn Fn(&InboundMessage, &O)>;

/// Outcome of firing a message at an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    /// No live operation holds the token.
    UnknownToken,
    /// The status had no alias, or the handler had no callback attached.
    Unhandled,
    /// The handler ran and the operation stays registered.
    Retained,
    /// The handler ran and the operation was removed.
    Removed,
    /// The handler panicked. The operation is left as it was.
    Failed,
}

struct Slot<O> {
    callback: Option<Rc<RefCell<Callback<O>>>>,
    auto_remove: bool,
    post: Option<PostCallback<O>>,
}

pub(super) struct PendingOperation<O> {
    token: Token,
    owner: O,
    handlers: HashMap<String, Slot<O>>,
    aliases: HashMap<String, String>,
    registry: Weak<RefCell<Entries<O>>>,
}

/// Handle to one outstanding client-issued action.
///
/// Handles are cheap to clone; all clones refer to the same operation. The
/// builder-style methods consume and return the handle so handlers can be
/// chained straight off a command:
///
/// ```rust
/// use blockd::correlation::{Registry, handler};
/// use blockd::protocol::InboundMessage;
///
/// let registry: Registry<()> = Registry::new();
/// let op = registry
///     .create(())
///     .define_for_status("locked", handler::THEN, false, None)
///     .then(|message, _| println!("got {}", message.status));
///
/// op.fire_for_status("LOCKED", &InboundMessage::new("LOCKED", vec![]));
/// ```
pub struct Operation<O> {
    inner: Rc<RefCell<PendingOperation<O>>>,
}

impl<O> Clone for Operation<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O> fmt::Debug for Operation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(op) => f.debug_struct("Operation").field("token", &op.token).finish(),
            Err(_) => f.debug_struct("Operation").finish_non_exhaustive(),
        }
    }
}

impl<O: Clone + 'static> Operation<O> {
    pub(super) fn new(token: Token, owner: O, registry: Weak<RefCell<Entries<O>>>) -> Self {
        let op = PendingOperation {
            token,
            owner,
            handlers: HashMap::new(),
            aliases: HashMap::new(),
            registry,
        };
        Self {
            inner: Rc::new(RefCell::new(op)),
        }
    }

    pub fn token(&self) -> Token {
        self.inner.borrow().token.clone()
    }

    pub fn owner(&self) -> O {
        self.inner.borrow().owner.clone()
    }

    /// Declare a handler slot. Replaces anything previously declared under `name`.
    pub fn define(self, name: &str, auto_remove: bool, post: Option<PostCallback<O>>) -> Self {
        let slot = Slot {
            callback: None,
            auto_remove,
            post,
        };
        self.inner.borrow_mut().handlers.insert(name.to_string(), slot);
        self
    }

    /// Route `status` to `name` and declare the slot.
    pub fn define_for_status(
        self,
        status: &str,
        name: &str,
        auto_remove: bool,
        post: Option<PostCallback<O>>,
    ) -> Self {
        self.inner
            .borrow_mut()
            .aliases
            .insert(normalize_status(status), name.to_string());
        self.define(name, auto_remove, post)
    }

    /// Attach behavior to a declared slot.
    pub fn on<F>(self, name: &str, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        let callback: Callback<O> = Box::new(callback);
        {
            let mut op = self.inner.borrow_mut();
            let token = op.token.clone();
            let slot = op.handlers.entry(name.to_string()).or_insert_with(|| {
                debug!("operation {token} has no slot '{name}', declaring one");
                Slot {
                    callback: None,
                    auto_remove: false,
                    post: None,
                }
            });
            slot.callback = Some(Rc::new(RefCell::new(callback)));
        }
        self
    }

    pub fn then<F>(self, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        self.on(handler::THEN, callback)
    }

    pub fn pending<F>(self, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        self.on(handler::PENDING, callback)
    }

    pub fn timeout<F>(self, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        self.on(handler::TIMEOUT, callback)
    }

    pub fn released<F>(self, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        self.on(handler::RELEASED, callback)
    }

    pub fn no_lock<F>(self, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        self.on(handler::NO_LOCK, callback)
    }

    pub fn no_locks<F>(self, callback: F) -> Self
    where
        F: FnMut(&InboundMessage, &O) + 'static,
    {
        self.on(handler::NO_LOCKS, callback)
    }

    /// Handler name `status` is routed to, if any.
    pub fn alias(&self, status: &str) -> Option<String> {
        self.inner
            .borrow()
            .aliases
            .get(&normalize_status(status))
            .cloned()
    }

    /// Run the handler registered under `name`: callback, then post-callback, then
    /// removal from the registry when the slot asks for it.
    ///
    /// No borrow of the operation is held while user code runs, so callbacks may
    /// issue new commands or attach further handlers.
    pub fn fire(&self, name: &str, message: &InboundMessage) -> Fired {
        let (callback, auto_remove, post, owner, token, registry) = {
            let op = self.inner.borrow();
            let Some(slot) = op.handlers.get(name) else {
                warn!("operation {} has no handler named '{name}'", op.token);
                return Fired::Unhandled;
            };
            let Some(callback) = slot.callback.clone() else {
                warn!("operation {} has no callback attached to '{name}'", op.token);
                return Fired::Unhandled;
            };
            (
                callback,
                slot.auto_remove,
                slot.post.clone(),
                op.owner.clone(),
                op.token.clone(),
                op.registry.clone(),
            )
        };

        match callback.try_borrow_mut() {
            Ok(mut callback) => (*callback)(message, &owner),
            Err(_) => {
                warn!("handler '{name}' of operation {token} is already running");
                return Fired::Unhandled;
            }
        }

        if let Some(post) = post {
            post(message, &owner);
        }

        if !auto_remove {
            return Fired::Retained;
        }

        if let Some(entries) = registry.upgrade() {
            Registry::from_entries(entries).remove(&token);
        }
        Fired::Removed
    }

    /// Resolve `status` through the alias table and fire the matching handler.
    pub fn fire_for_status(&self, status: &str, message: &InboundMessage) -> Fired {
        let Some(name) = self.alias(status) else {
            warn!(
                "operation {} has no handler for status '{status}'",
                self.inner.borrow().token
            );
            return Fired::Unhandled;
        };
        self.fire(&name, message)
    }
}
