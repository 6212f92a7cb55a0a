use std::time::Duration;

use log::info;

use crate::{
    config::LockMode,
    correlation::{Operation, handler},
    protocol::{Command, status},
};

use super::{ClientHandle, LockClient};

impl LockClient {
    /// Ask the server for its info banner. Fires `then` with the `quote` payload.
    pub fn info(&self) -> Operation<ClientHandle> {
        info!("requesting info from the server");

        let op = self
            .create()
            .define_for_status(status::INFO_OK, handler::THEN, true, None);
        self.send(&op, Command::Info);
        op
    }

    /// Acquire `lock_id` with the configured default timeout and mode.
    pub fn acquire(&self, lock_id: &str) -> Operation<ClientHandle> {
        self.acquire_with(lock_id, None, None)
    }

    /// Acquire `lock_id`. A zero timeout falls back to the configured default.
    ///
    /// The returned operation moves through `pending` (queued behind other holders)
    /// and `then` (lock held) without leaving the registry, and ends with either
    /// `timeout` or, once the lock is let go, `released`.
    pub fn acquire_with(
        &self,
        lock_id: &str,
        timeout: Option<Duration>,
        mode: Option<LockMode>,
    ) -> Operation<ClientHandle> {
        let timeout = timeout
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(self.config().default_timeout);
        let mode = mode.unwrap_or(self.config().default_lock_mode);
        let timeout = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        info!("acquiring lock {mode} {lock_id} with timeout {timeout}ms");

        let op = self
            .create()
            .define_for_status(status::LOCK_PENDING, handler::PENDING, false, None)
            .define_for_status(status::LOCKED, handler::THEN, false, None)
            .define_for_status(status::ACQUIRE_TIMEOUT, handler::TIMEOUT, true, None)
            .define_for_status(status::RELEASED, handler::RELEASED, true, None);
        self.send(
            &op,
            Command::Acquire {
                lock_id: lock_id.to_string(),
                timeout,
                mode,
            },
        );
        op
    }

    /// Release `lock_id`. Fires `then`, or `noLock` when nothing was held.
    pub fn release(&self, lock_id: &str) -> Operation<ClientHandle> {
        info!("releasing lock {lock_id}");

        let op = self
            .create()
            .define_for_status(status::RELEASED, handler::THEN, true, None)
            .define_for_status(status::NO_LOCK_TO_RELEASE, handler::NO_LOCK, true, None);
        self.send(
            &op,
            Command::Release {
                lock_id: lock_id.to_string(),
            },
        );
        op
    }

    /// Release every lock held by this connection. Fires `then`, or `noLocks`.
    pub fn release_all(&self) -> Operation<ClientHandle> {
        info!("releasing all locks for this connection");

        let op = self
            .create()
            .define_for_status(status::RELEASED, handler::THEN, true, None)
            .define_for_status(status::NO_LOCKS_TO_RELEASE, handler::NO_LOCKS, true, None);
        self.send(&op, Command::ReleaseAll);
        op
    }

    /// List the server's locks. Fires `then` with the `locks` payload.
    pub fn show(&self) -> Operation<ClientHandle> {
        info!("requesting lock list");

        let op = self
            .create()
            .define_for_status(status::SHOW_RESULT, handler::THEN, true, None);
        self.send(&op, Command::Show);
        op
    }
}
