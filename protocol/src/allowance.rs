//! # Allowance Engine
//!
//! Tracks delegated spending rights and the fee liability they imply.
//!
//! Each `(owner, spender)` pair has a [`Grant`]: the authorized amount plus
//! the fee that spending all of it would cost the owner right now. The
//! owner's *allowance holding* is the sum of those fees over all of its
//! spenders.
//!
//! ## Holding Model
//!
//! A grant's `held_fee` is never adjusted incrementally. Whenever a grant's
//! amount changes it is recomputed as `fee_of(amount, owner_exempt)`, and
//! the owner's holding is re-summed from its grants. Exemption toggles and
//! fee-rate changes reprice every affected grant the same way. This keeps
//!
//! ```text
//! held_fee(owner, spender) == fee_of(allowance(owner, spender), exempt(owner))
//! holding(owner)           == Σ held_fee(owner, *)
//! ```
//!
//! true after every operation, no matter how floor-division would have
//! rounded a chain of partial spends.
//!
//! Holding is bookkeeping only. It never locks balance; the ledger checks
//! the real balance at spend time. The sum saturates at `u64::MAX` so
//! several unlimited approvals cannot make bookkeeping fail.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};
use crate::exemption::ExemptionRegistry;
use crate::fee::FeePolicy;
use crate::ledger::InvariantViolation;

/// One spender's authorization against one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Amount the spender may still move out of the owner's balance.
    pub amount: u64,
    /// Fee the owner would pay if `amount` were spent now.
    pub held_fee: u64,
}

impl Grant {
    fn priced(amount: u64, policy: &FeePolicy, owner_exempt: bool) -> Self {
        Self {
            amount,
            held_fee: policy.fee_of(amount, owner_exempt),
        }
    }
}

/// All grants and per-owner holdings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceBook {
    /// `owner -> spender -> grant`.
    grants: HashMap<Address, BTreeMap<Address, Grant>>,
    /// Cached `Σ held_fee` per owner.
    holdings: HashMap<Address, u64>,
}

impl AllowanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.grant(owner, spender).amount
    }

    /// The full grant for a pair; zero if none was ever made.
    pub fn grant(&self, owner: &Address, spender: &Address) -> Grant {
        self.grants
            .get(owner)
            .and_then(|g| g.get(spender))
            .copied()
            .unwrap_or_default()
    }

    /// Aggregate fee liability of `owner`'s outstanding grants.
    pub fn holding(&self, owner: &Address) -> u64 {
        self.holdings.get(owner).copied().unwrap_or(0)
    }

    /// Owners with at least one grant on record.
    pub fn owners(&self) -> impl Iterator<Item = &Address> {
        self.grants.keys()
    }

    /// Every grant `owner` has made, by spender.
    pub fn grants_of(&self, owner: &Address) -> impl Iterator<Item = (&Address, &Grant)> {
        self.grants.get(owner).into_iter().flat_map(|g| g.iter())
    }

    /// The allowance `increase` would produce, or `Overflow`.
    pub fn increased(&self, owner: &Address, spender: &Address, added: u64) -> LedgerResult<u64> {
        self.allowance(owner, spender)
            .checked_add(added)
            .ok_or(LedgerError::Overflow("allowance"))
    }

    /// The allowance left after taking `amount` off the pair, or
    /// `InsufficientAllowance` if the grant does not cover it.
    pub fn reduced(&self, owner: &Address, spender: &Address, amount: u64) -> LedgerResult<u64> {
        let allowance = self.allowance(owner, spender);
        allowance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                allowance,
                requested: amount,
            })
    }

    /// Sets the pair's allowance to `amount` and reprices its held fee.
    ///
    /// This is the only write path for grant amounts; approve, increase,
    /// decrease and delegated spends all end here once validated.
    pub fn set(
        &mut self,
        owner: Address,
        spender: Address,
        amount: u64,
        policy: &FeePolicy,
        owner_exempt: bool,
    ) {
        self.grants
            .entry(owner)
            .or_default()
            .insert(spender, Grant::priced(amount, policy, owner_exempt));
        self.resum(owner);
    }

    /// Recomputes every held fee of `owner` under `policy`.
    ///
    /// Called when the owner's exemption flips or the fee rate changes.
    pub fn reprice_owner(&mut self, owner: Address, policy: &FeePolicy, owner_exempt: bool) {
        let Some(grants) = self.grants.get_mut(&owner) else {
            return;
        };
        for grant in grants.values_mut() {
            *grant = Grant::priced(grant.amount, policy, owner_exempt);
        }
        self.resum(owner);
    }

    /// Recomputes the cached holding for `owner` from its grants.
    fn resum(&mut self, owner: Address) {
        let total = Self::sum_held(self.grants.get(&owner));
        self.holdings.insert(owner, total);
    }

    fn sum_held(grants: Option<&BTreeMap<Address, Grant>>) -> u64 {
        grants
            .map(|g| g.values().fold(0u64, |acc, grant| acc.saturating_add(grant.held_fee)))
            .unwrap_or(0)
    }

    /// Checks every grant against its price under `policy` and every cached
    /// holding against its grants.
    pub(crate) fn audit(
        &self,
        policy: &FeePolicy,
        exemptions: &ExemptionRegistry,
    ) -> Result<(), InvariantViolation> {
        for (owner, grants) in &self.grants {
            let exempt = exemptions.is_exempt(owner);
            for (spender, grant) in grants {
                let expected = Grant::priced(grant.amount, policy, exempt).held_fee;
                if grant.held_fee != expected {
                    return Err(InvariantViolation::MispricedGrant {
                        owner: *owner,
                        spender: *spender,
                        held_fee: grant.held_fee,
                        expected,
                    });
                }
            }

            let expected = Self::sum_held(Some(grants));
            let cached = self.holding(owner);
            if cached != expected {
                return Err(InvariantViolation::StaleHolding {
                    owner: *owner,
                    cached,
                    expected,
                });
            }
        }

        if let Some((owner, cached)) = self
            .holdings
            .iter()
            .find(|(owner, _)| !self.grants.contains_key(*owner))
        {
            return Err(InvariantViolation::OrphanHolding {
                owner: *owner,
                cached: *cached,
            });
        }
        Ok(())
    }
}
