//! # CLI Interface
//!
//! Defines the command-line argument structure for `comrade-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.
//! Every `run` flag can also be set through a `COMRADE_*` environment
//! variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Comrade ledger node.
///
/// Hosts a single transfer-taxed token ledger, serves its HTTP/WS API,
/// persists snapshots to disk, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "comrade-node",
    about = "Comrade token ledger node",
    version,
    propagate_version = true
)]
pub struct ComradeNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and serve the API.
    Run(RunArgs),
    /// Write a genesis file for a new ledger.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the REST and WebSocket API.
    #[arg(long, env = "COMRADE_LISTEN_PORT", default_value_t = 9841)]
    pub listen_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "COMRADE_METRICS_PORT", default_value_t = 9842)]
    pub metrics_port: u16,

    /// Snapshot file. Loaded at start-up when present, rewritten after
    /// every successful mutation and on shutdown.
    #[arg(long, env = "COMRADE_STATE", default_value = "comrade-state.json")]
    pub state: PathBuf,

    /// Genesis file used when no snapshot exists yet.
    #[arg(long, env = "COMRADE_GENESIS")]
    pub genesis: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "COMRADE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(
        long,
        env = "COMRADE_LOG_LEVEL",
        default_value = "comrade_node=info,comrade_protocol=info,tower_http=debug"
    )]
    pub log_level: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the genesis file.
    #[arg(long, short = 'o', default_value = "genesis.json")]
    pub output: PathBuf,

    /// Owner account (0x-prefixed hex). Receives the whole supply.
    #[arg(long, conflicts_with = "owner_label")]
    pub owner: Option<String>,

    /// Derive the owner address from a label instead of passing hex.
    #[arg(long)]
    pub owner_label: Option<String>,

    /// Protocol wallet that receives fees. Defaults to the owner.
    #[arg(long)]
    pub protocol_wallet: Option<String>,

    /// Fee rate in basis points (100 = 1%).
    #[arg(long, default_value_t = comrade_protocol::config::DEFAULT_FEE_BPS)]
    pub fee_rate_bps: u32,

    /// Tokens minted to the owner.
    #[arg(long, default_value_t = comrade_protocol::config::DEFAULT_TOTAL_SUPPLY)]
    pub total_supply: u64,

    /// Overwrite an existing genesis file.
    #[arg(long)]
    pub force: bool,
}
