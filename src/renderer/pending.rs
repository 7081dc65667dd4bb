//! Pending-call table of the renderer

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;

use crate::{Error, Result};

type Resolver = oneshot::Sender<Result<JsonValue>>;

#[derive(Default)]
struct PendingState {
    closed: bool,
    calls: HashMap<String, Resolver>,
}

/// Calls awaiting an invoke-response, keyed by request id
pub(crate) struct PendingCalls {
    /// Request ID counter
    next_id: AtomicU64,
    state: Mutex<PendingState>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(PendingState::default()),
        }
    }

    /// Allocate a fresh request id and its result channel
    pub(crate) fn register(&self) -> Result<(String, oneshot::Receiver<Result<JsonValue>>)> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::TransportClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let (tx, rx) = oneshot::channel();
        state.calls.insert(id.clone(), tx);

        Ok((id, rx))
    }

    /// Complete the call `id`; false when nothing was waiting for it
    pub(crate) fn resolve(&self, id: &str, outcome: Result<JsonValue>) -> bool {
        let resolver = self.state.lock().calls.remove(id);
        match resolver {
            // The caller may have stopped waiting in the meantime
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    pub(crate) fn remove(&self, id: &str) {
        self.state.lock().calls.remove(id);
    }

    /// Refuse new calls and fail every pending one with `TransportClosed`
    pub(crate) fn close(&self) -> usize {
        let drained: Vec<Resolver> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.calls.drain().map(|(_, tx)| tx).collect()
        };

        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Err(Error::TransportClosed));
        }
        count
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().calls.len()
    }
}

/// Removes a pending entry when the waiting call goes away
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: String,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(pending: &'a PendingCalls, id: String) -> Self {
        Self { pending, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}
