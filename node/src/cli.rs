//! # CLI Interface
//!
//! Command-line arguments for `stacks-rosetta-node`, parsed with `clap`
//! derive. Every `run` flag can also come from a `STACKS_ROSETTA_*`
//! environment variable.

use clap::{Parser, Subcommand};

use stacks_rosetta::config::FtMetadataMode;
use stacks_rosetta::StacksNetwork;

use crate::logging::LogFormat;

/// Rosetta construction API for the Stacks blockchain.
///
/// Serves the offline-signing construction flow and the network
/// endpoints, reading chain state from a stacks-node over its RPC port.
#[derive(Parser, Debug)]
#[command(
    name = "stacks-rosetta-node",
    about = "Rosetta construction API for Stacks",
    version,
    propagate_version = true
)]
pub struct RosettaNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Network to serve: mainnet or testnet.
    #[arg(long, short = 'n', env = "STACKS_ROSETTA_NETWORK", default_value = "testnet")]
    pub network: StacksNetwork,

    /// Port for the Rosetta API.
    #[arg(long, short = 'p', env = "STACKS_ROSETTA_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "STACKS_ROSETTA_METRICS_PORT", default_value_t = 9153)]
    pub metrics_port: u16,

    /// Base URL of the stacks-node RPC interface.
    #[arg(long, env = "STACKS_ROSETTA_NODE_RPC_URL", default_value = "http://127.0.0.1:20443")]
    pub node_rpc_url: String,

    /// Upper bound, in seconds, on every call to the stacks-node.
    #[arg(long, env = "STACKS_ROSETTA_RPC_TIMEOUT_SECS", default_value_t = 10)]
    pub rpc_timeout_secs: u64,

    /// What `parse` does with a token event whose metadata cannot be
    /// resolved: `warn` drops the event, `strict` fails the request.
    #[arg(long, env = "STACKS_ROSETTA_FT_METADATA_MODE", default_value = "warn")]
    pub ft_metadata_mode: FtMetadataMode,

    /// Log output format.
    #[arg(long, env = "STACKS_ROSETTA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
