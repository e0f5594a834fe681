//! Fundamental types for the ballot registry.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! session ids, voter identities, timestamps and the clock abstraction.

pub mod clock;
pub mod error;
pub mod session;
pub mod time;
pub mod voter;

pub use clock::{Clock, SystemClock};
pub use error::TypeError;
pub use session::SessionId;
pub use time::Timestamp;
pub use voter::VoterId;
