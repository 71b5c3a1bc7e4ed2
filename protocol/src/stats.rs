//! Per-account transfer statistics.
//!
//! Two running totals per sender: principal successfully sent and fees
//! paid. Both only ever grow, and only the ledger's transfer paths update
//! them, after a transfer has passed every check.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};

/// Cumulative totals for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStats {
    /// Principal sent in successful transfers.
    pub tokens_sent: u64,
    /// Fees paid on those transfers.
    pub fees_paid: u64,
}

impl AccountStats {
    /// Totals after one more transfer, or `Overflow` if either would wrap.
    pub fn after_transfer(&self, amount: u64, fee: u64) -> LedgerResult<Self> {
        Ok(Self {
            tokens_sent: self
                .tokens_sent
                .checked_add(amount)
                .ok_or(LedgerError::Overflow("tokens sent"))?,
            fees_paid: self
                .fees_paid
                .checked_add(fee)
                .ok_or(LedgerError::Overflow("fees paid"))?,
        })
    }
}

/// Statistics for every account that has ever sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsTracker {
    accounts: HashMap<Address, AccountStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals for `addr`; zero for accounts that never sent.
    pub fn get(&self, addr: &Address) -> AccountStats {
        self.accounts.get(addr).copied().unwrap_or_default()
    }

    pub fn total_tokens_sent(&self, addr: &Address) -> u64 {
        self.get(addr).tokens_sent
    }

    pub fn total_fees_paid(&self, addr: &Address) -> u64 {
        self.get(addr).fees_paid
    }

    /// Every account with recorded statistics.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountStats)> {
        self.accounts.iter()
    }

    /// Stores precomputed totals. Callers compute them with
    /// [`AccountStats::after_transfer`] before committing anything.
    pub(crate) fn set(&mut self, addr: Address, stats: AccountStats) {
        self.accounts.insert(addr, stats);
    }
}
