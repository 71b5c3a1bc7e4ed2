//! # Fee Math
//!
//! Conversions between what a sender names (the principal) and what it is
//! debited (principal plus fee), at a given rate in basis points.
//!
//! The ledger computes `fee = floor(amount * rate / 10_000)`, so the debit
//! `d(p) = p + floor(p * rate / 10_000)` is strictly increasing in `p`.
//! Inverting it is a closed-form estimate followed by at most two upward
//! steps to absorb the floor.

use comrade_protocol::config::BPS_DENOMINATOR;
use comrade_protocol::fee::fee_at_rate;

/// Total debited from a non-exempt sender for a principal of `amount`.
///
/// `None` if the sum does not fit in a `u64`.
pub fn debit_for(amount: u64, rate_bps: u32) -> Option<u64> {
    amount.checked_add(fee_at_rate(amount, rate_bps))
}

/// The largest principal whose debit fits within `budget`.
///
/// Exact: `debit_for(p) <= budget` and `debit_for(p + 1) > budget`.
pub fn max_principal_within(budget: u64, rate_bps: u32) -> u64 {
    let denom = u128::from(BPS_DENOMINATOR);
    let estimate = u128::from(budget) * denom / (denom + u128::from(rate_bps));
    // estimate <= budget, so the cast is lossless.
    let mut principal = estimate as u64;

    while principal < budget {
        match debit_for(principal + 1, rate_bps) {
            Some(debit) if debit <= budget => principal += 1,
            _ => break,
        }
    }
    principal
}
