//! # Comrade Fee-Aware Callers
//!
//! Accounts and helpers that sit on top of the ledger's public surface and
//! deal with the fee on the caller's side:
//!
//! - **fee_math** — Gross/net conversion. How much a principal really
//!   costs, and the largest principal a budget covers.
//! - **forwarder** — An intermediary account that passes its funds on
//!   without tripping over its own fee, plus `send_with_budget` for
//!   one-off "spend at most this much" transfers.
//!
//! ## Design Principles
//!
//! 1. Nothing here touches ledger internals. Every move goes through
//!    `Ledger::transfer`, so the ledger's checks still apply.
//! 2. Conversions are exact under the ledger's floor division. A principal
//!    returned by `max_principal_within` never fails with `CannotPayFee`.

pub mod fee_math;
pub mod forwarder;

pub use forwarder::{send_with_budget, ForwardError, Forwarder};
