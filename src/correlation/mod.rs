//! Matching server messages to the operations waiting on them.
//!
//! Every command the client issues is represented by an [`Operation`]: a small
//! per-command state machine holding named handlers and a table that routes status
//! codes to those handlers. Operations live in a [`Registry`] keyed by the [`Token`]
//! sent along with the command, and stay there until a handler marked for removal
//! fires.
//!
//! # Firing
//!
//! A status is first normalized (case-insensitive, `_` and `-` equivalent) and looked
//! up in the operation's alias table. The resolved handler then runs in three strictly
//! ordered, synchronous steps:
//!
//! 1. the caller's callback,
//! 2. the post-callback declared with the slot, if any,
//! 3. removal from the registry, if the slot was declared with `auto_remove`.
//!
//! Unknown tokens, unmapped statuses and slots nobody attached a callback to are
//! logged and otherwise ignored.
//!
//! # Lifetimes
//!
//! Operations point back at their registry weakly, and nothing here cancels an
//! operation: one that never receives a terminal status stays registered until it is
//! removed explicitly.
mod operation;
mod registry;
mod token;

pub use operation::{Callback, Fired, Operation, PostCallback, handler};
pub use registry::Registry;
pub use token::{SequentialTokens, Token, TokenGenerator, UuidTokens};
