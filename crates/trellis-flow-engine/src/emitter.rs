//! Per-execution fan-out of committed mutations to live observers.
//!
//! Each execution gets its own bounded broadcast channel. Emission never
//! blocks the orchestration path: a slow observer lags and loses events
//! (delivery is at-most-once per observer per event) instead of applying
//! backpressure, and a disconnected observer is simply gone. Late
//! subscribers miss everything committed before they attached.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::events::ExecutionEvent;

/// Registry of live per-execution event channels.
pub struct ProgressEmitter {
    channels: RwLock<HashMap<String, broadcast::Sender<ExecutionEvent>>>,
    capacity: usize,
}

impl ProgressEmitter {
    /// `capacity` bounds each per-execution channel; observers that fall
    /// more than `capacity` events behind start losing the oldest ones.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Open the channel for an execution. Idempotent.
    pub fn register(&self, execution_id: &str) {
        let mut channels = self.channels.write();
        channels
            .entry(execution_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
    }

    /// Attach an observer to a live execution. `None` once the execution
    /// has finished (or never existed).
    pub fn subscribe(&self, execution_id: &str) -> Option<broadcast::Receiver<ExecutionEvent>> {
        self.channels
            .read()
            .get(execution_id)
            .map(|tx| tx.subscribe())
    }

    /// Fan an event out to the execution's observers. Never blocks; having
    /// no observers is not an error.
    pub fn emit(&self, event: ExecutionEvent) {
        let channels = self.channels.read();
        if let Some(tx) = channels.get(event.execution_id()) {
            let _ = tx.send(event);
        }
    }

    /// Drop the channel after the terminal event. Observers drain whatever
    /// is buffered, then see the stream close.
    pub fn remove(&self, execution_id: &str) {
        self.channels.write().remove(execution_id);
    }
}
