//! Ballot node: hosts the voting registry behind the RPC and WebSocket
//! servers.
//!
//! The node:
//! - Restores the registry from its snapshot on startup
//! - Fans registry events out to WebSocket subscribers and metrics
//! - Runs the servers until SIGINT/SIGTERM
//! - Persists a fresh snapshot on stop

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use metrics::RegistryMetrics;
pub use node::BallotNode;
pub use shutdown::ShutdownController;
