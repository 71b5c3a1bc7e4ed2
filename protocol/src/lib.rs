// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Comrade Ledger — Core Library
//!
//! A fixed-supply token ledger where every transfer may carry a
//! proportional fee, paid by the sender on top of the principal and routed
//! to a protocol wallet. Accounts can be exempted from fees, the owner can
//! tune the rate, and the ledger keeps running totals of what each account
//! has sent and paid.
//!
//! ## Architecture
//!
//! - **fee** — `fee_of(amount, exempt)`. Pure, floor-division, `u128` wide.
//! - **exemption** — The set of fee-exempt accounts. Strict toggles.
//! - **ledger** — Balances, supply, and the transfer rule. The only place
//!   value moves.
//! - **allowance** — Delegated spending plus the "holding": the fee that
//!   outstanding allowances would cost their owners under current terms.
//! - **stats** — Cumulative principal sent and fees paid per account.
//! - **admin** — Owner-only changes to rate, wallet and exemptions.
//! - **events** — What hosts forward to subscribers after each call.
//! - **config** — Constants plus the genesis and live config records.
//! - **address** — 20-byte account ids, hex on the wire.
//!
//! ## Execution Model
//!
//! The ledger is a plain value with synchronous methods. It expects its
//! host to serialize calls; in exchange each call is atomic: it either
//! applies all of its effects or returns an error and changes nothing.
//!
//! ## Design Rules
//!
//! 1. Amounts are `u64` in the smallest unit. No floats, ever.
//! 2. All arithmetic on balances is checked. Overflow is an error, not a wrap.
//! 3. Check everything, then write. No partial debits.

pub mod address;
pub mod admin;
pub mod allowance;
pub mod config;
pub mod error;
pub mod events;
pub mod exemption;
pub mod fee;
pub mod ledger;
pub mod stats;

pub use address::{Address, AddressError};
pub use allowance::{AllowanceBook, Grant};
pub use config::{GenesisConfig, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use events::LedgerEvent;
pub use exemption::ExemptionRegistry;
pub use fee::FeePolicy;
pub use ledger::{InvariantViolation, Ledger, TransferReceipt};
pub use stats::{AccountStats, StatsTracker};
