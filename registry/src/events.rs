//! Events emitted by the registry for observers.

use ballot_types::{SessionId, Timestamp, VoterId};
use serde::Serialize;

/// Registry-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A session was created and is accepting votes.
    SessionCreated {
        session_id: SessionId,
        title: String,
        candidates: Vec<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    /// A vote was accepted.
    VoteCast {
        session_id: SessionId,
        voter: VoterId,
        candidate_index: usize,
    },
    /// A session was finalized; `tally` is frozen from here on.
    ResultsCalculated {
        session_id: SessionId,
        tally: Vec<u64>,
    },
}

impl RegistryEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::VoteCast { session_id, .. }
            | Self::ResultsCalculated { session_id, .. } => *session_id,
        }
    }
}

/// Synchronous fan-out event bus for registry events.
///
/// Listeners are invoked inline on the calling thread while the touched
/// session is still locked; keep handlers fast and never call back into the
/// registry from one.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&RegistryEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RegistryEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &RegistryEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
