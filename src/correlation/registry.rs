use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::{debug, warn};

use crate::protocol::InboundMessage;

use super::{Fired, Operation, Token, TokenGenerator, UuidTokens};

pub(super) struct Entries<O> {
    operations: HashMap<Token, Operation<O>>,
    tokens: Box<dyn TokenGenerator>,
}

/// Live operations keyed by token.
///
/// Cloning a registry yields another handle to the same set of operations.
pub struct Registry<O> {
    inner: Rc<RefCell<Entries<O>>>,
}

impl<O> Clone for Registry<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O: Clone + 'static> Default for Registry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Clone + 'static> Registry<O> {
    pub fn new() -> Self {
        Self::with_tokens(UuidTokens)
    }

    pub fn with_tokens(tokens: impl TokenGenerator + 'static) -> Self {
        let entries = Entries {
            operations: HashMap::new(),
            tokens: Box::new(tokens),
        };
        Self {
            inner: Rc::new(RefCell::new(entries)),
        }
    }

    pub(super) fn from_entries(inner: Rc<RefCell<Entries<O>>>) -> Self {
        Self { inner }
    }

    /// Register a new, handler-less operation bound to `owner`.
    pub fn create(&self, owner: O) -> Operation<O> {
        let mut entries = self.inner.borrow_mut();

        let mut token = entries.tokens.generate();
        while entries.operations.contains_key(&token) {
            warn!("token {token} is already live, generating another");
            token = entries.tokens.generate();
        }

        let op = Operation::new(token.clone(), owner, Rc::downgrade(&self.inner));
        entries.operations.insert(token.clone(), op.clone());
        debug!("created operation {token}");
        op
    }

    /// Forget the operation holding `token`. Absent tokens are ignored.
    pub fn remove(&self, token: &Token) {
        let removed = self.inner.borrow_mut().operations.remove(token);
        if removed.is_some() {
            debug!("removed operation {token}");
        }
    }

    pub fn get(&self, token: &Token) -> Option<Operation<O>> {
        self.inner.borrow().operations.get(token).cloned()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.inner.borrow().operations.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand `message` to the operation holding `token`.
    pub fn dispatch(&self, token: &Token, message: &InboundMessage) -> Fired {
        match self.get(token) {
            Some(op) => op.fire_for_status(&message.status, message),
            None => {
                warn!("no pending operation for token {token}");
                Fired::UnknownToken
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::HashSet};

    use crate::correlation::{SequentialTokens, handler};

    use super::*;

    /// Always hands out the same token first, then counts up.
    struct Stuttering {
        calls: Cell<u32>,
    }

    impl TokenGenerator for Stuttering {
        fn generate(&self) -> Token {
            let calls = self.calls.get();
            self.calls.set(calls + 1);
            match calls {
                0 | 1 => Token::from("dup"),
                n => Token::new(format!("t{n}")),
            }
        }
    }

    fn message(status: &str, token: &str) -> InboundMessage {
        InboundMessage::new(status, vec![Token::from(token)])
    }

    #[test]
    fn registry_create() {
        let registry: Registry<()> = Registry::with_tokens(SequentialTokens::default());

        let op = registry.create(());

        assert_eq!(op.token(), Token::from("t1"));
        assert!(registry.contains(&op.token()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_tokens_are_distinct() {
        let registry: Registry<()> = Registry::new();

        let tokens: HashSet<Token> = (0..50).map(|_| registry.create(()).token()).collect();

        assert_eq!(tokens.len(), 50);
        assert_eq!(registry.len(), 50);
    }

    #[test]
    fn registry_skips_live_tokens() {
        let registry: Registry<()> = Registry::with_tokens(Stuttering {
            calls: Cell::new(0),
        });

        let first = registry.create(());
        let second = registry.create(());

        assert_eq!(first.token(), Token::from("dup"));
        assert_eq!(second.token(), Token::from("t2"));
    }

    #[test]
    fn registry_remove_is_idempotent() {
        let registry: Registry<()> = Registry::with_tokens(SequentialTokens::default());
        let op = registry.create(());

        registry.remove(&op.token());
        registry.remove(&op.token());
        registry.remove(&Token::from("never-issued"));

        assert!(registry.is_empty());
    }

    #[test]
    fn dispatch_unknown_token() {
        let registry: Registry<()> = Registry::with_tokens(SequentialTokens::default());
        let op = registry
            .create(())
            .define_for_status("LOCKED", handler::THEN, true, None)
            .then(|_, _| panic!("must not fire"));

        let fired = registry.dispatch(&Token::from("t42"), &message("LOCKED", "t42"));

        assert_eq!(fired, Fired::UnknownToken);
        assert!(registry.contains(&op.token()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dispatch_terminal_status_removes_once() {
        let registry: Registry<()> = Registry::with_tokens(SequentialTokens::default());
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let op = registry
            .create(())
            .define_for_status("INFO-OK", handler::THEN, true, None)
            .then(move |_, _| counter.set(counter.get() + 1));
        let token = op.token();

        assert_eq!(registry.dispatch(&token, &message("info-ok", "t1")), Fired::Removed);
        assert_eq!(
            registry.dispatch(&token, &message("info-ok", "t1")),
            Fired::UnknownToken
        );
        assert_eq!(calls.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn dispatch_unmapped_status_leaves_operation() {
        let registry: Registry<()> = Registry::with_tokens(SequentialTokens::default());
        let op = registry
            .create(())
            .define_for_status("SHOW-RESULT", handler::THEN, true, None)
            .then(|_, _| {});

        let fired = registry.dispatch(&op.token(), &message("BOGUS", "t1"));

        assert_eq!(fired, Fired::Unhandled);
        assert!(registry.contains(&op.token()));
    }

    #[test]
    fn dispatch_after_registry_dropped() {
        let registry: Registry<()> = Registry::with_tokens(SequentialTokens::default());
        let op = registry
            .create(())
            .define_for_status("CLOSE-OK", handler::THEN, true, None)
            .then(|_, _| {});
        drop(registry);

        assert_eq!(op.fire_for_status("close-ok", &message("close-ok", "t1")), Fired::Removed);
    }
}
