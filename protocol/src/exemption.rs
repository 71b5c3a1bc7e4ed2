//! Fee exemption registry.
//!
//! A set of accounts that never pay transfer fees. Toggling membership is
//! strict: adding an account that is already exempt, or removing one that
//! is not, is an error rather than a silent no-op. Ownership checks are
//! done by the ledger before it touches the registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};

/// The set of fee-exempt accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExemptionRegistry {
    members: BTreeSet<Address>,
}

impl ExemptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `addr` as exempt. Fails with `AlreadyExempt` if it already is.
    pub fn add(&mut self, addr: Address) -> LedgerResult<()> {
        if !self.members.insert(addr) {
            return Err(LedgerError::AlreadyExempt(addr));
        }
        Ok(())
    }

    /// Clears the exemption of `addr`. Fails with `NotExempt` if it has none.
    pub fn remove(&mut self, addr: Address) -> LedgerResult<()> {
        if !self.members.remove(&addr) {
            return Err(LedgerError::NotExempt(addr));
        }
        Ok(())
    }

    pub fn is_exempt(&self, addr: &Address) -> bool {
        self.members.contains(addr)
    }

    /// Number of exempt accounts.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Exempt accounts in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }
}
