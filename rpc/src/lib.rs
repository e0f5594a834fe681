//! HTTP/JSON server for the ballot registry.
//!
//! Provides endpoints for:
//! - Session creation and listing
//! - Vote submission (caller identity from the `x-voter-id` header)
//! - Finalization
//! - Session info, live tallies, winners and voter membership
//! - Prometheus metrics

pub mod error;
pub mod extract;
pub mod handlers;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer, RpcState, VOTER_ID_HEADER};
