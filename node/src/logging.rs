//! # Structured Logging
//!
//! One `tracing` subscriber for the whole node. The ledger library logs
//! every applied transfer, allowance change and admin change at `debug`
//! and rejected admin calls at `warn`; the API adds request spans through
//! `TraceLayer` and logs rejected mutations with their error code. The
//! filter decides how much of that reaches the output.
//!
//! Output goes to stderr. `init` and `version` print their results on
//! stdout, so the two streams can be redirected separately.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored lines with source locations.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber for `comrade-node run`.
///
/// `default_level` comes from `--log-level` / `COMRADE_LOG_LEVEL` and only
/// applies when `RUST_LOG` is unset. To trace every ledger transition
/// while keeping HTTP spans quiet:
///
/// ```text
/// RUST_LOG=comrade_protocol=debug,comrade_node=info,tower_http=warn
/// ```
///
/// Pretty output carries file and line for local debugging. JSON output
/// keeps structured fields such as `from`, `to`, `amount` and `fee` as
/// separate keys for log aggregation.
///
/// Panics if a global subscriber is already installed.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::info!(?format, "comrade-node logging ready");
}
