//! Event bus - named local events over broadcast channels
//!
//! Emission is a synchronous in-process send, no queuing beyond each
//! channel's buffer and no cross-process delivery. Every subscriber holds
//! its own receiver, so one lagging or dropped subscriber never affects
//! delivery to the others.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

/// Per-subscriber buffer; events beyond this lag are dropped for that
/// subscriber only.
const CHANNEL_CAPACITY: usize = 32;

/// Named-event bus backing [`Hive`](crate::Hive) notifications.
#[derive(Default)]
pub struct EventBus {
    channels: RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `event`. Every payload fired for `event` after this call
    /// is delivered to the returned receiver.
    pub fn subscribe(&self, event: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write();
        channels
            .entry(event.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Emit `payload` to all current subscribers of `event`. A send with no
    /// subscribers is a no-op.
    pub fn fire(&self, event: &str, payload: serde_json::Value) {
        trace!(event, "fire");
        let channels = self.channels.read();
        if let Some(tx) = channels.get(event) {
            // Err means no live receivers; nothing to deliver.
            let _ = tx.send(payload);
        }
    }
}
