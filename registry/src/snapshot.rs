//! Registry snapshots for persistence across restarts.

use std::sync::Arc;

use ballot_types::Clock;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::registry::VotingRegistry;
use crate::session::VotingSession;

/// Current on-disk snapshot layout.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable copy of every session in the registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u32,
    pub sessions: Vec<VotingSession>,
}

impl RegistrySnapshot {
    /// Check layout version, dense ids and per-session invariants.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(RegistryError::Snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        for (index, session) in self.sessions.iter().enumerate() {
            if session.id.as_u64() != index as u64 {
                return Err(RegistryError::Snapshot(format!(
                    "session at position {index} carries id {}",
                    session.id
                )));
            }
            session.check_invariants().map_err(RegistryError::Snapshot)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        bincode::serialize(self).map_err(|e| RegistryError::Snapshot(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, RegistryError> {
        let snapshot: Self =
            bincode::deserialize(data).map_err(|e| RegistryError::Snapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl VotingRegistry {
    /// Capture every session. Each session is copied under its own lock.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            version: SNAPSHOT_VERSION,
            sessions: self.clone_sessions(),
        }
    }

    /// Rebuild a registry from snapshot bytes. Observers must be
    /// re-subscribed on the returned registry.
    pub fn restore(data: &[u8], clock: Arc<dyn Clock>) -> Result<Self, RegistryError> {
        let snapshot = RegistrySnapshot::from_bytes(data)?;
        tracing::info!(sessions = snapshot.sessions.len(), "registry restored from snapshot");
        Ok(Self::from_sessions(snapshot.sessions, clock))
    }
}
