//! The ballot node: owns the registry and runs the servers around it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ballot_registry::VotingRegistry;
use ballot_rpc::{RpcServer, RpcState};
use ballot_types::{Clock, SystemClock, Timestamp};
use ballot_utils::format_duration;
use ballot_websocket::{WebSocketServer, WsState};
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::RegistryMetrics;
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BallotNode {
    pub config: NodeConfig,
    pub registry: Arc<VotingRegistry>,
    pub ws_state: Arc<WsState>,
    pub metrics: Arc<RegistryMetrics>,
    pub shutdown: Arc<ShutdownController>,
    started_at: Timestamp,
    /// Handles for spawned server tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl BallotNode {
    /// Create a node reading the wall clock.
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    /// Create a node around an explicit time source.
    ///
    /// Restores `<data_dir>/registry.snapshot` when snapshots are enabled and
    /// the file exists, then wires the registry events to the WebSocket
    /// topics and the metrics.
    pub async fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        config.validate()?;
        let snapshot_path = config.snapshot_path();
        let mut registry = if config.persist_snapshots && snapshot_path.exists() {
            let bytes = tokio::fs::read(&snapshot_path).await?;
            let registry = VotingRegistry::restore(&bytes, Arc::clone(&clock))?;
            tracing::info!(
                path = %snapshot_path.display(),
                sessions = registry.session_count(),
                "loaded registry snapshot"
            );
            registry
        } else {
            VotingRegistry::new(Arc::clone(&clock))
        };

        let ws_state = Arc::new(WsState::new(config.event_channel_capacity, clock));
        let metrics = Arc::new(RegistryMetrics::new()?);
        metrics
            .session_count
            .set(i64::try_from(registry.session_count()).unwrap_or(i64::MAX));

        {
            let ws_state = Arc::clone(&ws_state);
            registry.subscribe(Box::new(move |event| ws_state.publish(event)));
        }
        {
            let metrics = Arc::clone(&metrics);
            registry.subscribe(Box::new(move |event| metrics.observe(event)));
        }

        Ok(Self {
            config,
            registry: Arc::new(registry),
            ws_state,
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            started_at: Timestamp::now(),
            task_handles: Vec::new(),
        })
    }

    /// Spawn the enabled servers without blocking.
    pub fn spawn_servers(&mut self) {
        // ── RPC server (optional) ─────────────────────────────────────────
        if self.config.enable_rpc {
            let metrics_registry = if self.config.enable_metrics {
                Some(self.metrics.registry.clone())
            } else {
                None
            };

            let rpc_state = Arc::new(RpcState {
                registry: Arc::clone(&self.registry),
                started_at: self.started_at.as_secs(),
                metrics_registry,
            });

            let rpc_server = RpcServer::with_state(self.config.rpc_port, rpc_state);
            let mut shutdown_rx_rpc = self.shutdown.subscribe();

            let rpc_handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = shutdown_rx_rpc.recv() => {
                        tracing::info!("RPC server shutting down");
                    }
                    result = rpc_server.start() => {
                        match result {
                            Ok(()) => tracing::info!("RPC server exited"),
                            Err(e) => tracing::error!("RPC server error: {e}"),
                        }
                    }
                }
            });
            self.task_handles.push(rpc_handle);
        }

        // ── WebSocket server (optional) ───────────────────────────────────
        if self.config.enable_websocket {
            let ws_server =
                WebSocketServer::with_state(self.config.websocket_port, Arc::clone(&self.ws_state));
            let mut shutdown_rx_ws = self.shutdown.subscribe();

            let ws_handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = shutdown_rx_ws.recv() => {
                        tracing::info!("WebSocket server shutting down");
                    }
                    result = ws_server.start() => {
                        match result {
                            Ok(()) => tracing::info!("WebSocket server exited"),
                            Err(e) => tracing::error!("WebSocket server error: {e}"),
                        }
                    }
                }
            });
            self.task_handles.push(ws_handle);
        }
    }

    /// Start the servers and block until a shutdown signal arrives.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        self.spawn_servers();
        tracing::info!(
            sessions = self.registry.session_count(),
            servers = self.task_handles.len(),
            "ballot node started"
        );

        self.shutdown.wait_for_signal().await;

        Ok(())
    }

    /// Stop the node gracefully.
    ///
    /// 1. Sends the shutdown signal to the server tasks.
    /// 2. Waits for them to finish (with timeout).
    /// 3. Writes a fresh snapshot when snapshots are enabled.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("ballot node stopping");
        self.shutdown.shutdown();

        for handle in self.task_handles.drain(..) {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("server task did not stop within {SHUTDOWN_TIMEOUT:?}");
            }
        }

        if self.config.persist_snapshots {
            self.persist_snapshot().await?;
        }

        let uptime = self.started_at.elapsed_since(Timestamp::now());
        tracing::info!(uptime = %format_duration(uptime), "ballot node stopped");
        Ok(())
    }

    /// Write the registry to `<data_dir>/registry.snapshot`.
    ///
    /// The bytes go to a sibling temp file first and are renamed into place,
    /// so a crash mid-write leaves the previous snapshot intact.
    pub async fn persist_snapshot(&self) -> Result<(), NodeError> {
        let bytes = self.registry.snapshot().to_bytes()?;
        let path = self.config.snapshot_path();
        write_atomically(&path, &bytes).await?;
        tracing::info!(
            path = %path.display(),
            bytes = bytes.len(),
            sessions = self.registry.session_count(),
            "registry snapshot persisted"
        );
        Ok(())
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), NodeError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = path.with_extension("snapshot.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_nullables::NullClock;
    use ballot_types::VoterId;

    fn test_config(dir: &Path) -> NodeConfig {
        NodeConfig {
            data_dir: dir.to_path_buf(),
            enable_rpc: false,
            enable_websocket: false,
            ..NodeConfig::default()
        }
    }

    #[tokio::test]
    async fn fresh_data_dir_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let node = BallotNode::with_clock(test_config(dir.path()), Arc::new(NullClock::new(0)))
            .await
            .unwrap();
        assert_eq!(node.registry.session_count(), 0);
        assert_eq!(node.metrics.session_count.get(), 0);
    }

    #[tokio::test]
    async fn stop_persists_and_new_restores() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(NullClock::new(100));

        let mut node = BallotNode::with_clock(test_config(dir.path()), clock.clone())
            .await
            .unwrap();
        let id = node
            .registry
            .create("lunch", vec!["soup".into(), "salad".into()], 60)
            .unwrap();
        node.registry
            .vote(id, 1, &VoterId::new("amy").unwrap())
            .unwrap();
        node.stop().await.unwrap();
        assert!(dir.path().join("registry.snapshot").exists());

        let restored = BallotNode::with_clock(test_config(dir.path()), clock.clone())
            .await
            .unwrap();
        assert_eq!(restored.registry.session_count(), 1);
        assert_eq!(restored.metrics.session_count.get(), 1);
        assert_eq!(restored.registry.tally(id).unwrap(), vec![0, 1]);
        assert!(restored
            .registry
            .has_voted(id, &VoterId::new("amy").unwrap())
            .unwrap());

        // The restored registry still emits to the new node's observers.
        clock.advance(61);
        restored.registry.finalize(id).unwrap();
        assert_eq!(restored.metrics.sessions_finalized.get(), 1);
    }

    #[tokio::test]
    async fn disabled_snapshots_leave_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            persist_snapshots: false,
            ..test_config(dir.path())
        };
        let mut node = BallotNode::with_clock(config, Arc::new(NullClock::new(0)))
            .await
            .unwrap();
        node.registry
            .create("x", vec!["a".into(), "b".into()], 5)
            .unwrap();
        node.stop().await.unwrap();
        assert!(!dir.path().join("registry.snapshot").exists());
    }

    #[tokio::test]
    async fn zero_channel_capacity_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            event_channel_capacity: 0,
            ..test_config(dir.path())
        };
        let result = BallotNode::with_clock(config, Arc::new(NullClock::new(0))).await;
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("registry.snapshot"), b"not a snapshot").unwrap();
        let result =
            BallotNode::with_clock(test_config(dir.path()), Arc::new(NullClock::new(0))).await;
        assert!(matches!(result, Err(NodeError::Registry(_))));
    }

    #[tokio::test]
    async fn registry_events_reach_websocket_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let node = BallotNode::with_clock(test_config(dir.path()), Arc::new(NullClock::new(0)))
            .await
            .unwrap();
        let mut sessions_rx = node.ws_state.sessions_tx.subscribe();

        node.registry
            .create("colour", vec!["red".into(), "blue".into()], 30)
            .unwrap();

        let text = sessions_rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["topic"], "sessions");
        assert_eq!(value["timestamp"], 0);
        assert_eq!(value["data"]["title"], "colour");
        assert_eq!(node.metrics.sessions_created.get(), 1);
        assert_eq!(node.metrics.session_count.get(), 1);
    }
}
