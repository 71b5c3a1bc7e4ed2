//! # Fee Policy
//!
//! The fee on a transfer is a flat proportion of the principal:
//!
//! ```text
//! fee = 0                                   if the payer is exempt
//! fee = floor(amount * rate_bps / 10_000)   otherwise
//! ```
//!
//! The multiplication runs in `u128`, so any `u64` amount times any rate
//! up to 10_000 bps fits without overflow. Since the rate never exceeds
//! 100%, the result always fits back into a `u64`.

use serde::{Deserialize, Serialize};

use crate::config::{validate_fee_rate, BPS_DENOMINATOR};
use crate::error::LedgerResult;

/// Computes fees at a fixed rate.
///
/// A `FeePolicy` is a snapshot of the ledger's current rate. It has no
/// other state, and computing a fee never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    rate_bps: u32,
}

impl FeePolicy {
    /// Creates a policy, rejecting rates above 100%.
    pub fn new(rate_bps: u32) -> LedgerResult<Self> {
        validate_fee_rate(rate_bps)?;
        Ok(Self { rate_bps })
    }

    /// Wraps a rate the caller has already validated.
    pub(crate) const fn from_validated(rate_bps: u32) -> Self {
        Self { rate_bps }
    }

    /// The rate in basis points.
    pub fn rate_bps(&self) -> u32 {
        self.rate_bps
    }

    /// Fee owed on `amount` by a payer whose exemption status is `is_exempt`.
    pub fn fee_of(&self, amount: u64, is_exempt: bool) -> u64 {
        if is_exempt {
            return 0;
        }
        fee_at_rate(amount, self.rate_bps)
    }
}

/// `floor(amount * rate_bps / 10_000)` with a wide intermediate.
///
/// Callers are expected to pass a rate of at most 10_000 bps; larger rates
/// saturate at `u64::MAX` rather than wrap.
pub fn fee_at_rate(amount: u64, rate_bps: u32) -> u64 {
    let fee = (amount as u128) * (rate_bps as u128) / (BPS_DENOMINATOR as u128);
    u64::try_from(fee).unwrap_or(u64::MAX)
}
