//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ballot_utils::LogFormat;

use crate::NodeError;

/// File name of the registry snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "registry.snapshot";

/// Configuration for a ballot node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the registry snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether to enable the RPC server.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// RPC port (if enabled).
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Whether to enable the WebSocket server.
    #[serde(default)]
    pub enable_websocket: bool,

    /// WebSocket port (if enabled).
    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to enable Prometheus metrics endpoint.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Load the snapshot on startup and write it back on stop.
    #[serde(default = "default_true")]
    pub persist_snapshots: bool,

    /// Buffer size of each WebSocket topic channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ballot_data")
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    7077
}

fn default_ws_port() -> u16 {
    7078
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_channel_capacity() -> usize {
    256
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the node cannot start with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.event_channel_capacity == 0 {
            return Err(NodeError::Config(
                "event_channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            enable_rpc: default_true(),
            rpc_port: default_rpc_port(),
            enable_websocket: false,
            websocket_port: default_ws_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
            persist_snapshots: default_true(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}
