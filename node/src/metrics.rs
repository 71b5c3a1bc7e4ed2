//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped by Prometheus at the
//! `/metrics` endpoint on the metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    core::Collector, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use comrade_protocol::LedgerEvent;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Successful transfers, direct and delegated.
    pub transfers_total: IntCounter,
    /// Rejected operations, labelled by ledger error code.
    pub rejected_total: IntCounterVec,
    /// Cumulative fees routed to the protocol wallet.
    pub fees_collected_total: IntCounter,
    /// Current protocol fee rate in basis points.
    pub fee_rate_bps: IntGauge,
    /// Accounts with a balance entry.
    pub accounts: IntGauge,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, metric: C) -> prometheus::Result<C> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("comrade".into()), None)?;

        let transfers_total = register(
            &registry,
            IntCounter::new("transfers_total", "Successful transfers, including delegated ones")?,
        )?;
        let rejected_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("rejected_operations_total", "Operations rejected by the ledger"),
                &["code"],
            )?,
        )?;
        let fees_collected_total = register(
            &registry,
            IntCounter::new("fees_collected_total", "Fees credited to the protocol wallet")?,
        )?;
        let fee_rate_bps = register(
            &registry,
            IntGauge::new("fee_rate_bps", "Protocol fee rate in basis points")?,
        )?;
        let accounts = register(
            &registry,
            IntGauge::new("accounts", "Accounts holding a balance entry")?,
        )?;

        Ok(Self {
            registry,
            transfers_total,
            rejected_total,
            fees_collected_total,
            fee_rate_bps,
            accounts,
        })
    }

    /// Folds a batch of drained ledger events into the counters.
    pub fn observe(&self, events: &[LedgerEvent]) {
        for event in events {
            match event {
                LedgerEvent::Transfer { .. } => self.transfers_total.inc(),
                LedgerEvent::FeeCollected { fee, .. } => self.fees_collected_total.inc_by(*fee),
                LedgerEvent::ProtocolPercChanged { new_bps, .. } => {
                    self.fee_rate_bps.set(i64::from(*new_bps))
                }
                _ => {}
            }
        }
    }

    /// Counts one rejected operation.
    pub fn reject(&self, code: &str) {
        self.rejected_total.with_label_values(&[code]).inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrade_protocol::Address;

    #[test]
    fn observe_counts_transfers_and_fees() {
        let m = LedgerMetrics::new().unwrap();
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        m.observe(&[
            LedgerEvent::Transfer { from: a, to: b, amount: 100 },
            LedgerEvent::FeeCollected { payer: a, wallet: b, fee: 7 },
            LedgerEvent::ProtocolPercChanged { old_bps: 100, new_bps: 250 },
        ]);

        assert_eq!(m.transfers_total.get(), 1);
        assert_eq!(m.fees_collected_total.get(), 7);
        assert_eq!(m.fee_rate_bps.get(), 250);
    }

    #[test]
    fn encode_includes_prefixed_names() {
        let m = LedgerMetrics::new().unwrap();
        m.reject("not_owner");
        let text = m.encode().unwrap();
        assert!(text.contains("comrade_rejected_operations_total{code=\"not_owner\"} 1"));
        assert!(text.contains("comrade_transfers_total 0"));
    }
}
