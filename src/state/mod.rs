//! Scan progress events.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring buffer of recent events so late subscribers can catch up.

mod types;

pub use types::*;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scenecatalog_common::{ItemId, MatchMethod};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

/// What happened during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStarted {
        status: ScanStatus,
    },
    PhaseChanged {
        from: ScanPhase,
        to: ScanPhase,
        status: ScanStatus,
    },
    ItemStarted {
        item_id: ItemId,
        title: String,
    },
    ItemCompleted {
        item_id: ItemId,
        title: String,
        confidence: f64,
        method: MatchMethod,
    },
    ItemFailed {
        item_id: ItemId,
        title: String,
        error: String,
        will_retry: bool,
    },
    ScanCompleted {
        status: ScanStatus,
    },
    ScanError {
        error: String,
        status: ScanStatus,
    },
    DuplicatesFound {
        fingerprint: String,
        item_ids: Vec<ItemId>,
    },
    IdentitySweepCompleted {
        fingerprinted: u64,
        submitted: u64,
        duplicates: u64,
    },
}

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: ScanEvent,
}

impl Event {
    pub fn new(payload: ScanEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus with the given broadcast buffer size.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event and store it in the ring buffer.
    pub fn broadcast(&self, payload: ScanEvent) {
        let event = Event::new(payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
