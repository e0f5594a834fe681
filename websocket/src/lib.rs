//! WebSocket server for real-time updates.
//!
//! Clients can subscribe to:
//! - New sessions
//! - Accepted votes (live tallies)
//! - Finalized results
//!
//! Vote and result subscriptions may be narrowed to a single session.

pub mod server;
pub mod subscriptions;

pub use server::{WebSocketServer, WsError, WsState};
pub use subscriptions::SubscriptionTopic;
