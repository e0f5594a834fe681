//! Ballot daemon: entry point for running a ballot node.

use anyhow::Context;
use ballot_node::{BallotNode, NodeConfig};
use ballot_utils::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ballot-daemon", about = "Voting registry node daemon")]
struct Cli {
    /// Directory holding the registry snapshot.
    #[arg(long, env = "BALLOT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable or disable the RPC server ("true" / "false").
    #[arg(long, env = "BALLOT_ENABLE_RPC")]
    rpc: Option<bool>,

    /// RPC server port.
    #[arg(long, env = "BALLOT_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable WebSocket server.
    #[arg(long, env = "BALLOT_ENABLE_WEBSOCKET")]
    websocket: bool,

    /// WebSocket server port.
    #[arg(long, env = "BALLOT_WS_PORT")]
    websocket_port: Option<u16>,

    /// Enable Prometheus metrics endpoint.
    #[arg(long, env = "BALLOT_ENABLE_METRICS")]
    metrics: bool,

    /// Neither load nor write the registry snapshot.
    #[arg(long, env = "BALLOT_NO_SNAPSHOTS")]
    no_snapshots: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "BALLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum NodeAction {
    /// Run the node.
    Run,
    /// Print the effective configuration as TOML.
    Config,
}

/// Merge the optional config file with CLI flags and env vars.
fn build_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match cli.config {
        Some(ref path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => NodeConfig::default(),
    };

    Ok(NodeConfig {
        data_dir: cli.data_dir.clone().unwrap_or(base.data_dir),
        enable_rpc: cli.rpc.unwrap_or(base.enable_rpc),
        rpc_port: cli.rpc_port.unwrap_or(base.rpc_port),
        enable_websocket: cli.websocket || base.enable_websocket,
        websocket_port: cli.websocket_port.unwrap_or(base.websocket_port),
        enable_metrics: cli.metrics || base.enable_metrics,
        persist_snapshots: !cli.no_snapshots && base.persist_snapshots,
        log_level: cli.log_level.clone().unwrap_or(base.log_level),
        log_format: cli.log_format.unwrap_or(base.log_format),
        ..base
    })
}

fn on_off(enabled: bool, port: u16) -> String {
    if enabled {
        port.to_string()
    } else {
        "off".into()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Config => {
                print!("{}", config.to_toml_string()?);
            }
            NodeAction::Run => {
                ballot_utils::init_logging(config.log_format, &config.log_level);
                if let Some(ref path) = cli.config {
                    tracing::info!("Loaded config from {}", path.display());
                }
                tracing::info!(
                    "Starting ballot node (data: {}, RPC:{}, WS:{}, snapshots:{})",
                    config.data_dir.display(),
                    on_off(config.enable_rpc, config.rpc_port),
                    on_off(config.enable_websocket, config.websocket_port),
                    if config.persist_snapshots { "on" } else { "off" },
                );

                let mut node = BallotNode::new(config).await?;
                node.start().await?;

                tracing::info!("Shutdown signal received, stopping node");
                node.stop().await?;

                tracing::info!("ballot daemon exited cleanly");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ballot-daemon"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["node", "run"]);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let config = build_config(&parse(&[])).unwrap();
        assert!(config.enable_rpc);
        assert_eq!(config.rpc_port, 7077);
        assert!(!config.enable_websocket);
        assert!(config.persist_snapshots);
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rpc_port = 9000\nwebsocket_port = 9001\nlog_level = \"debug\"\nenable_metrics = true"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&[
            "--config",
            &path,
            "--rpc-port",
            "9100",
            "--websocket",
            "--log-format",
            "json",
            "--no-snapshots",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.rpc_port, 9100);
        assert_eq!(config.websocket_port, 9001);
        assert!(config.enable_websocket);
        assert!(config.enable_metrics);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.persist_snapshots);
    }

    #[test]
    fn rpc_can_be_disabled() {
        let config = build_config(&parse(&["--rpc", "false"])).unwrap();
        assert!(!config.enable_rpc);
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/ballot.toml"]);
        assert!(build_config(&cli).is_err());
    }
}
