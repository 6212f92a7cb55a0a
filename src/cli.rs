//! CLI utilities for blockd.
//!
//! The utilities present in this module can be used to build an interactive shell on top
//! of a [`LockClient`]: read a [`ShellCommand`] from the user, issue it, and wait for the
//! server's answer.
use std::{
    cell::RefCell,
    io::{self, BufRead, Write},
    rc::Rc,
};

use log::info;
use serde_json::Value;
use thiserror::Error;

use crate::{
    ClientError, ClientHandle, CommandError, LockClient, ShellCommand, protocol::InboundMessage,
};

#[derive(Debug, Error)]
pub enum PromptError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("failed to read command: {0}")]
    Io(#[from] io::Error),
}

/// Prompt user for a valid shell command. End of input reads as `.exit`.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<ShellCommand, PromptError>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "> ")?;
    writer.flush()?;

    if reader.read_line(&mut s)? == 0 {
        return Ok(ShellCommand::Exit);
    }

    Ok(ShellCommand::try_from(s.as_str())?)
}

type Reply = Rc<RefCell<Option<String>>>;

/// Handler storing `render(message)` as the command's reply.
fn answer(
    reply: &Reply,
    render: fn(&InboundMessage) -> String,
) -> impl FnMut(&InboundMessage, &ClientHandle) + use<> {
    let reply = Rc::clone(reply);
    move |message: &InboundMessage, _: &ClientHandle| *reply.borrow_mut() = Some(render(message))
}

fn render_locks(message: &InboundMessage) -> String {
    let locks = message.locks().unwrap_or_default();
    if locks.is_empty() {
        return "no locks".to_string();
    }

    locks
        .iter()
        .map(|lock| match lock {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// Issue `command` on `client` and poll until one of its handlers answers.
///
/// Returns `None` if the connection went away before an answer arrived.
pub fn execute(client: &LockClient, command: ShellCommand) -> Result<Option<String>, ClientError> {
    let reply: Reply = Rc::default();

    match command {
        ShellCommand::Info => {
            client
                .info()
                .then(answer(&reply, |m| m.quote().unwrap_or("ok").to_string()));
        }
        ShellCommand::Acquire {
            lock_id,
            timeout,
            mode,
        } => {
            client
                .acquire_with(&lock_id, timeout, mode)
                .pending(|_, _| info!("lock is held elsewhere, waiting"))
                .then(answer(&reply, |_| "locked".to_string()))
                .timeout(answer(&reply, |_| "timed out".to_string()))
                .released(answer(&reply, |_| "released".to_string()));
        }
        ShellCommand::Release { lock_id } => {
            client
                .release(&lock_id)
                .then(answer(&reply, |_| "released".to_string()))
                .no_lock(answer(&reply, |_| "no lock to release".to_string()));
        }
        ShellCommand::ReleaseAll => {
            client
                .release_all()
                .then(answer(&reply, |_| "released".to_string()))
                .no_locks(answer(&reply, |_| "no locks to release".to_string()));
        }
        ShellCommand::Show => {
            client.show().then(answer(&reply, render_locks));
        }
        ShellCommand::Exit => {
            client.close().then(answer(&reply, |_| "bye".to_string()));
        }
    }

    while reply.borrow().is_none() {
        if !client.poll()? {
            break;
        }
    }

    Ok(reply.take())
}
