// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Comrade Ledger Node
//!
//! Entry point for the `comrade-node` binary. Parses CLI arguments,
//! initializes logging and metrics, restores the ledger, and serves the
//! HTTP/WS API until a shutdown signal arrives.
//!
//! The binary supports three subcommands:
//!
//! - `run`     start the node
//! - `init`    write a genesis file
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod state;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, RwLock};

use comrade_protocol::{Address, GenesisConfig};

use cli::{Commands, ComradeNodeCli};
use metrics::LedgerMetrics;
use state::SnapshotStore;

/// Broadcast channel capacity for live event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ComradeNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_genesis(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Restores the ledger and serves the API and metrics endpoints.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, args.log_format);

    tracing::info!(
        listen_port = args.listen_port,
        metrics_port = args.metrics_port,
        state = %args.state.display(),
        "starting comrade-node"
    );

    // --- Ledger ---
    let store = Arc::new(SnapshotStore::new(&args.state));
    let ledger = state::open_ledger(&store, args.genesis.as_deref())?;
    // Persist right away so a genesis-only start survives a crash.
    store.save(&ledger).await?;

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);
    ledger_metrics.fee_rate_bps.set(i64::from(ledger.protocol_perc()));
    ledger_metrics.accounts.set(ledger.account_count() as i64);

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger: Arc::new(RwLock::new(ledger)),
        event_tx,
        metrics: Arc::clone(&ledger_metrics),
        store: Some(Arc::clone(&store)),
    };

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.listen_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, saving snapshot");
        }
    }

    let ledger = app_state.ledger.read().await;
    store
        .save(&ledger)
        .await
        .context("failed to write final snapshot")?;
    tracing::info!(digest = %ledger.state_digest(), "comrade-node stopped");
    Ok(())
}

/// Writes a genesis file from the `init` arguments.
fn init_genesis(args: cli::InitArgs) -> Result<()> {
    let owner = match (&args.owner, &args.owner_label) {
        (Some(hex), _) => Address::parse(hex).context("invalid --owner")?,
        (None, Some(label)) => Address::from_label(label),
        (None, None) => return Err(anyhow!("one of --owner or --owner-label is required")),
    };
    let protocol_wallet = match &args.protocol_wallet {
        Some(hex) => Address::parse(hex).context("invalid --protocol-wallet")?,
        None => owner,
    };

    let genesis = GenesisConfig::new(owner, protocol_wallet)
        .with_fee_rate(args.fee_rate_bps)
        .with_total_supply(args.total_supply);
    genesis
        .ledger_config()
        .validate()
        .context("invalid genesis parameters")?;

    state::write_genesis(&args.output, &genesis, args.force)?;

    println!("Genesis written.");
    println!("  File            : {}", args.output.display());
    println!("  Owner           : {}", owner);
    println!("  Protocol wallet : {}", protocol_wallet);
    println!("  Fee rate (bps)  : {}", args.fee_rate_bps);
    println!("  Total supply    : {}", args.total_supply);

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("comrade-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
