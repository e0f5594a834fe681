//! The voting registry.
//!
//! Holds every voting session and exposes the four operations of the session
//! state machine: create, vote, finalize and the read accessors
//! (info, tally, winners, membership).
//!
//! Lifecycle per session: `Open` → (implicitly) `Open-Expired` once the clock
//! passes `end_time` → `Finalized` after an explicit [`VotingRegistry::finalize`].
//! There is no cancel or reopen.
//!
//! Key principle: one identity = one vote per session (not stake-weighted).

pub mod error;
pub mod events;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod tally;

pub use error::RegistryError;
pub use events::{EventBus, RegistryEvent};
pub use registry::VotingRegistry;
pub use session::{SessionInfo, SessionSummary, VotingSession};
pub use snapshot::RegistrySnapshot;
pub use tally::winning_indices;
