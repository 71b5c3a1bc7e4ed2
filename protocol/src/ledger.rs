//! # Ledger Core
//!
//! Balances, total supply, and the transfer rule. This is the only module
//! that moves value.
//!
//! ## Transfer Rule
//!
//! A transfer of `amount` from `payer` to `to`:
//!
//! ```text
//! 1. balance(payer) <  amount          -> InsufficientBalance
//! 2. fee = fee_of(amount, exempt(payer))
//! 3. balance(payer) <  amount + fee    -> CannotPayFee
//! 4. payer  -= amount + fee
//!    to     += amount
//!    wallet += fee                      (separate entry, only if fee > 0)
//! 5. stats(payer) += (amount, fee)
//! ```
//!
//! The two balance checks are reported separately so a caller can tell
//! "send less" apart from "top up to cover the fee".
//!
//! ## Atomicity
//!
//! Every mutating call first builds a plan holding the final value of
//! every slot it will write (balances, statistics, grants). Building the
//! plan is where all checks happen and is the only fallible step. Applying
//! a plan cannot fail, so a rejected call leaves the ledger untouched.
//! Staging final values also takes care of aliasing: a payer that is also
//! the recipient or the protocol wallet nets out correctly.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::allowance::AllowanceBook;
use crate::config::{GenesisConfig, LedgerConfig, MAX_FEE_BPS};
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::exemption::ExemptionRegistry;
use crate::fee::FeePolicy;
use crate::stats::{AccountStats, StatsTracker};

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// A broken ledger invariant, found by [`Ledger::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Balances do not add up to the total supply.
    #[error("balances sum to {sum} but total supply is {total_supply}")]
    SupplyMismatch { sum: u128, total_supply: u64 },

    /// The configured fee rate is out of bounds.
    #[error("fee rate {0} bps exceeds the maximum")]
    FeeRateOutOfBounds(u32),

    /// An owner's cached holding disagrees with its grants.
    #[error("holding of {owner} is {cached}, grants imply {expected}")]
    StaleHolding {
        owner: Address,
        cached: u64,
        expected: u64,
    },

    /// A grant's held fee is not the fee its amount costs at today's rate.
    #[error("grant {owner} -> {spender} holds {held_fee}, current terms give {expected}")]
    MispricedGrant {
        owner: Address,
        spender: Address,
        held_fee: u64,
        expected: u64,
    },

    /// A cached holding for an owner with no grants at all.
    #[error("holding of {owner} is {cached} but it has no grants")]
    OrphanHolding { owner: Address, cached: u64 },
}

// ---------------------------------------------------------------------------
// Transfer Plan
// ---------------------------------------------------------------------------

/// Fully validated effects of one transfer, ready to apply.
#[derive(Debug)]
struct TransferPlan {
    payer: Address,
    to: Address,
    amount: u64,
    fee: u64,
    /// Final balance of every touched account.
    balances: BTreeMap<Address, u64>,
    /// Payer's statistics after the transfer.
    stats: AccountStats,
}

/// Outcome of a successful transfer, for callers that want the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Principal credited to the recipient.
    pub amount: u64,
    /// Fee credited to the protocol wallet.
    pub fee: u64,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// A transfer-taxed token ledger.
///
/// The ledger assumes its host runs one call at a time. It holds no locks
/// of its own; wrap it in one if it is shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    pub(crate) config: LedgerConfig,
    pub(crate) total_supply: u64,
    pub(crate) balances: HashMap<Address, u64>,
    pub(crate) allowances: AllowanceBook,
    pub(crate) exemptions: ExemptionRegistry,
    pub(crate) stats: StatsTracker,
    /// Undrained events. Not part of a snapshot.
    #[serde(skip)]
    pub(crate) events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Creates a ledger and mints the whole supply to the genesis owner.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RateTooHigh`] if the genesis fee rate exceeds
    /// 10_000 bps.
    pub fn new(genesis: GenesisConfig) -> LedgerResult<Self> {
        let config = genesis.ledger_config();
        config.validate()?;

        let mut balances = HashMap::new();
        balances.insert(genesis.owner, genesis.total_supply);

        info!(
            owner = %genesis.owner,
            protocol_wallet = %genesis.protocol_wallet,
            fee_rate_bps = genesis.fee_rate_bps,
            total_supply = genesis.total_supply,
            "ledger created"
        );

        Ok(Self {
            config,
            total_supply: genesis.total_supply,
            balances,
            allowances: AllowanceBook::new(),
            exemptions: ExemptionRegistry::new(),
            stats: StatsTracker::new(),
            events: vec![LedgerEvent::Transfer {
                from: Address::ZERO,
                to: genesis.owner,
                amount: genesis.total_supply,
            }],
        })
    }

    // -- Queries ------------------------------------------------------------

    pub fn balance_of(&self, addr: &Address) -> u64 {
        self.balances.get(addr).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.allowance(owner, spender)
    }

    /// Fee liability implied by `owner`'s outstanding allowances.
    pub fn allowance_holding(&self, owner: &Address) -> u64 {
        self.allowances.holding(owner)
    }

    pub fn owner(&self) -> Address {
        self.config.owner
    }

    /// Current fee rate in basis points.
    pub fn protocol_perc(&self) -> u32 {
        self.config.fee_rate_bps
    }

    pub fn protocol_wallet(&self) -> Address {
        self.config.protocol_wallet
    }

    pub fn is_exempt(&self, addr: &Address) -> bool {
        self.exemptions.is_exempt(addr)
    }

    /// Cumulative fees `addr` has paid on successful transfers.
    pub fn total_fees_paid(&self, addr: &Address) -> u64 {
        self.stats.total_fees_paid(addr)
    }

    /// Cumulative principal `addr` has sent in successful transfers.
    pub fn total_tokens_sent(&self, addr: &Address) -> u64 {
        self.stats.total_tokens_sent(addr)
    }

    /// Both statistics for `addr`.
    pub fn stats_of(&self, addr: &Address) -> AccountStats {
        self.stats.get(addr)
    }

    /// The fee `payer` would owe on `amount` right now.
    pub fn fee_of(&self, amount: u64, payer: &Address) -> u64 {
        self.fee_policy().fee_of(amount, self.is_exempt(payer))
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy::from_validated(self.config.fee_rate_bps)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn exemptions(&self) -> &ExemptionRegistry {
        &self.exemptions
    }

    /// Number of accounts with a balance entry.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Takes every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // -- Transfers ----------------------------------------------------------

    /// Moves `amount` from `sender` to `recipient`, charging the sender's fee
    /// on top.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if the sender cannot cover the
    /// principal, [`LedgerError::CannotPayFee`] if it covers the principal
    /// but not the fee.
    pub fn transfer(
        &mut self,
        sender: Address,
        recipient: Address,
        amount: u64,
    ) -> LedgerResult<TransferReceipt> {
        let plan = self.plan_transfer(sender, recipient, amount)?;
        Ok(self.apply_transfer(plan))
    }

    /// Moves `amount` out of `owner`'s balance on behalf of `spender`.
    ///
    /// Same fee rule as [`transfer`](Self::transfer), charged to `owner`.
    /// On success the pair's allowance drops by `amount` and the owner's
    /// holding is repriced from what remains.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientAllowance`] if the grant does not cover
    /// `amount`; otherwise the same errors as `transfer`.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: u64,
    ) -> LedgerResult<TransferReceipt> {
        let remaining = self.allowances.reduced(&owner, &spender, amount)?;
        let plan = self.plan_transfer(owner, recipient, amount)?;

        let receipt = self.apply_transfer(plan);
        self.write_allowance(owner, spender, remaining);
        debug!(%owner, %spender, remaining, "allowance consumed");
        Ok(receipt)
    }

    fn plan_transfer(&self, payer: Address, to: Address, amount: u64) -> LedgerResult<TransferPlan> {
        let balance = self.balance_of(&payer);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance { balance, amount });
        }

        let fee = self.fee_of(amount, &payer);
        let debit = amount
            .checked_add(fee)
            .filter(|total| *total <= balance)
            .ok_or(LedgerError::CannotPayFee { balance, amount, fee })?;

        let mut balances = BTreeMap::new();
        balances.insert(payer, balance - debit);
        credit(&mut balances, self, to, amount)?;
        if fee > 0 {
            credit(&mut balances, self, self.config.protocol_wallet, fee)?;
        }

        let stats = self.stats.get(&payer).after_transfer(amount, fee)?;

        Ok(TransferPlan {
            payer,
            to,
            amount,
            fee,
            balances,
            stats,
        })
    }

    fn apply_transfer(&mut self, plan: TransferPlan) -> TransferReceipt {
        let TransferPlan {
            payer,
            to,
            amount,
            fee,
            balances,
            stats,
        } = plan;

        self.balances.extend(balances);
        self.stats.set(payer, stats);

        self.events.push(LedgerEvent::Transfer {
            from: payer,
            to,
            amount,
        });
        if fee > 0 {
            self.events.push(LedgerEvent::FeeCollected {
                payer,
                wallet: self.config.protocol_wallet,
                fee,
            });
        }

        debug!(from = %payer, %to, amount, fee, "transfer applied");
        TransferReceipt { amount, fee }
    }

    // -- Allowances ---------------------------------------------------------

    /// Sets `spender`'s allowance over `owner`'s balance to exactly `amount`.
    ///
    /// Replaces any earlier grant for the pair, including its share of the
    /// owner's holding. Never moves balance.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u64) -> LedgerResult<()> {
        self.write_allowance(owner, spender, amount);
        debug!(%owner, %spender, amount, "allowance approved");
        Ok(())
    }

    /// Raises `spender`'s allowance by `added`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Overflow`] if the allowance would exceed `u64::MAX`.
    pub fn increase_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        added: u64,
    ) -> LedgerResult<()> {
        let amount = self.allowances.increased(&owner, &spender, added)?;
        self.write_allowance(owner, spender, amount);
        debug!(%owner, %spender, added, amount, "allowance increased");
        Ok(())
    }

    /// Lowers `spender`'s allowance by `subtracted`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientAllowance`] if `subtracted` exceeds the
    /// current allowance.
    pub fn decrease_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        subtracted: u64,
    ) -> LedgerResult<()> {
        let amount = self.allowances.reduced(&owner, &spender, subtracted)?;
        self.write_allowance(owner, spender, amount);
        debug!(%owner, %spender, subtracted, amount, "allowance decreased");
        Ok(())
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, amount: u64) {
        let policy = self.fee_policy();
        let exempt = self.is_exempt(&owner);
        self.allowances.set(owner, spender, amount, &policy, exempt);
        self.events.push(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
    }

    // -- Integrity ----------------------------------------------------------

    /// Verifies supply conservation, rate bounds and holding consistency.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let sum: u128 = self.balances.values().map(|b| *b as u128).sum();
        if sum != self.total_supply as u128 {
            return Err(InvariantViolation::SupplyMismatch {
                sum,
                total_supply: self.total_supply,
            });
        }

        if self.config.fee_rate_bps > MAX_FEE_BPS {
            return Err(InvariantViolation::FeeRateOutOfBounds(
                self.config.fee_rate_bps,
            ));
        }

        self.allowances.audit(&self.fee_policy(), &self.exemptions)
    }

    /// BLAKE3 digest of the canonical ledger state, hex-encoded.
    ///
    /// Two ledgers with the same config, balances, grants, exemptions and
    /// statistics produce the same digest regardless of map iteration
    /// order. Zero balances are ignored.
    pub fn state_digest(&self) -> String {
        let balances: BTreeMap<&Address, u64> = self
            .balances
            .iter()
            .filter(|(_, b)| **b > 0)
            .map(|(a, b)| (a, *b))
            .collect();

        // Tuple keys are not valid JSON object keys, so grants go in as a
        // sorted list of rows.
        let mut grants: Vec<(Address, Address, u64, u64)> = Vec::new();
        for owner in self.allowances.owners() {
            for (spender, grant) in self.allowances.grants_of(owner) {
                grants.push((*owner, *spender, grant.amount, grant.held_fee));
            }
        }
        grants.sort_unstable();

        let stats: BTreeMap<&Address, AccountStats> =
            self.stats.iter().map(|(a, s)| (a, *s)).collect();

        let bytes = serde_json::to_vec(&(
            &self.config,
            self.total_supply,
            &balances,
            &grants,
            &self.exemptions,
            &stats,
        ))
        .unwrap_or_else(|e| {
            warn!(error = %e, "state digest input failed to serialize");
            Vec::new()
        });
        blake3::hash(&bytes).to_hex().to_string()
    }
}

/// Stages `to += amount` on top of whatever the plan already holds for `to`.
fn credit(
    staged: &mut BTreeMap<Address, u64>,
    ledger: &Ledger,
    to: Address,
    amount: u64,
) -> LedgerResult<()> {
    let current = staged
        .get(&to)
        .copied()
        .unwrap_or_else(|| ledger.balance_of(&to));
    let next = current
        .checked_add(amount)
        .ok_or(LedgerError::Overflow("balance"))?;
    staged.insert(to, next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    /// Owner holds `supply`, protocol wallet is "wallet", rate is `bps`.
    fn ledger(supply: u64, bps: u32) -> Ledger {
        let genesis = GenesisConfig::new(addr("owner"), addr("wallet"))
            .with_fee_rate(bps)
            .with_total_supply(supply);
        let mut ledger = Ledger::new(genesis).unwrap();
        ledger.drain_events();
        ledger
    }

    /// A ledger where `account` holds exactly `balance`.
    fn funded(account: &str, balance: u64, bps: u32) -> Ledger {
        let mut l = ledger(1_000_000, 0);
        l.transfer(addr("owner"), addr(account), balance).unwrap();
        l.config.fee_rate_bps = bps;
        l.drain_events();
        l
    }

    #[test]
    fn genesis_mints_to_owner() {
        let genesis = GenesisConfig::new(addr("owner"), addr("wallet"));
        let mut l = Ledger::new(genesis).unwrap();
        assert_eq!(l.balance_of(&addr("owner")), l.total_supply());
        assert_eq!(l.owner(), addr("owner"));
        assert_eq!(
            l.drain_events(),
            vec![LedgerEvent::Transfer {
                from: Address::ZERO,
                to: addr("owner"),
                amount: 1_000_000
            }]
        );
    }

    #[test]
    fn genesis_rejects_rate_above_max() {
        let genesis = GenesisConfig::new(addr("owner"), addr("wallet")).with_fee_rate(10_001);
        assert!(matches!(
            Ledger::new(genesis),
            Err(LedgerError::RateTooHigh { rate_bps: 10_001, .. })
        ));
    }

    #[test]
    fn transfer_charges_fee_on_top() {
        let mut l = funded("alice", 100, 1_000);
        let receipt = l.transfer(addr("alice"), addr("bob"), 10).unwrap();
        assert_eq!(receipt, TransferReceipt { amount: 10, fee: 1 });
        assert_eq!(l.balance_of(&addr("bob")), 10);
        assert_eq!(l.balance_of(&addr("alice")), 89);
        assert_eq!(l.balance_of(&addr("wallet")), 1);
        l.check_invariants().unwrap();
    }

    #[test]
    fn principal_check_precedes_fee_check() {
        let mut l = funded("alice", 450, 1_000);
        assert_eq!(
            l.transfer(addr("alice"), addr("x"), 500),
            Err(LedgerError::InsufficientBalance { balance: 450, amount: 500 })
        );
        assert_eq!(
            l.transfer(addr("alice"), addr("x"), 450),
            Err(LedgerError::CannotPayFee { balance: 450, amount: 450, fee: 45 })
        );
        assert_eq!(l.balance_of(&addr("alice")), 450);
        assert_eq!(l.total_tokens_sent(&addr("alice")), 0);
        assert!(l.drain_events().is_empty());
    }

    #[test]
    fn fee_events_are_separate() {
        let mut l = funded("alice", 100, 1_000);
        l.transfer(addr("alice"), addr("bob"), 50).unwrap();
        assert_eq!(
            l.drain_events(),
            vec![
                LedgerEvent::Transfer { from: addr("alice"), to: addr("bob"), amount: 50 },
                LedgerEvent::FeeCollected { payer: addr("alice"), wallet: addr("wallet"), fee: 5 },
            ]
        );
    }

    #[test]
    fn self_transfer_costs_only_the_fee() {
        let mut l = funded("alice", 100, 1_000);
        l.transfer(addr("alice"), addr("alice"), 50).unwrap();
        assert_eq!(l.balance_of(&addr("alice")), 95);
        assert_eq!(l.balance_of(&addr("wallet")), 5);
        l.check_invariants().unwrap();
    }

    #[test]
    fn wallet_paying_itself_is_conserved() {
        let mut l = funded("wallet", 100, 1_000);
        l.transfer(addr("wallet"), addr("bob"), 50).unwrap();
        // Debited 55, credited back 5 as the fee entry.
        assert_eq!(l.balance_of(&addr("wallet")), 50);
        assert_eq!(l.balance_of(&addr("bob")), 50);
        assert_eq!(l.total_fees_paid(&addr("wallet")), 5);
        l.check_invariants().unwrap();
    }

    #[test]
    fn zero_amount_transfer_succeeds() {
        let mut l = funded("alice", 0, 1_000);
        let receipt = l.transfer(addr("alice"), addr("bob"), 0).unwrap();
        assert_eq!(receipt.fee, 0);
        assert_eq!(l.drain_events().len(), 1);
    }

    #[test]
    fn statistics_accumulate_across_transfers() {
        let mut l = funded("alice", 1_000, 1_000);
        l.transfer(addr("alice"), addr("bob"), 100).unwrap();
        l.transfer(addr("alice"), addr("carol"), 200).unwrap();
        assert_eq!(l.total_tokens_sent(&addr("alice")), 300);
        assert_eq!(l.total_fees_paid(&addr("alice")), 30);
        assert_eq!(l.total_tokens_sent(&addr("bob")), 0);
    }

    #[test]
    fn delegated_spend_consumes_allowance_and_holding() {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("spender"), 50).unwrap();
        assert_eq!(l.allowance_holding(&addr("alice")), 5);
        assert_eq!(l.balance_of(&addr("alice")), 100);

        l.transfer_from(addr("spender"), addr("alice"), addr("bob"), 50)
            .unwrap();
        assert_eq!(l.balance_of(&addr("alice")), 45);
        assert_eq!(l.balance_of(&addr("bob")), 50);
        assert_eq!(l.balance_of(&addr("wallet")), 5);
        assert_eq!(l.allowance(&addr("alice"), &addr("spender")), 0);
        assert_eq!(l.allowance_holding(&addr("alice")), 0);
        assert_eq!(l.total_tokens_sent(&addr("alice")), 50);
        assert_eq!(l.total_tokens_sent(&addr("spender")), 0);
    }

    #[test]
    fn delegated_spend_checks_allowance_first() {
        let mut l = funded("alice", 10, 1_000);
        l.approve(addr("alice"), addr("spender"), 5).unwrap();
        assert_eq!(
            l.transfer_from(addr("spender"), addr("alice"), addr("bob"), 20),
            Err(LedgerError::InsufficientAllowance { allowance: 5, requested: 20 })
        );
    }

    #[test]
    fn failed_delegated_spend_keeps_allowance() {
        let mut l = funded("alice", 50, 1_000);
        l.approve(addr("alice"), addr("spender"), 50).unwrap();
        l.drain_events();
        assert!(matches!(
            l.transfer_from(addr("spender"), addr("alice"), addr("bob"), 50),
            Err(LedgerError::CannotPayFee { fee: 5, .. })
        ));
        assert_eq!(l.allowance(&addr("alice"), &addr("spender")), 50);
        assert_eq!(l.allowance_holding(&addr("alice")), 5);
        assert!(l.drain_events().is_empty());
    }

    #[test]
    fn approve_overwrites() {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("s"), 80).unwrap();
        l.approve(addr("alice"), addr("s"), 30).unwrap();
        assert_eq!(l.allowance(&addr("alice"), &addr("s")), 30);
        assert_eq!(l.allowance_holding(&addr("alice")), 3);
    }

    #[test]
    fn allowance_ops_never_move_balance() {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("s"), 1_000).unwrap();
        l.increase_allowance(addr("alice"), addr("s"), 500).unwrap();
        l.decrease_allowance(addr("alice"), addr("s"), 200).unwrap();
        assert_eq!(l.balance_of(&addr("alice")), 100);
        assert_eq!(l.total_tokens_sent(&addr("alice")), 0);
        assert_eq!(l.allowance(&addr("alice"), &addr("s")), 1_300);
        assert_eq!(l.allowance_holding(&addr("alice")), 130);

        let approval = |amount| LedgerEvent::Approval {
            owner: addr("alice"),
            spender: addr("s"),
            amount,
        };
        assert_eq!(
            l.drain_events(),
            vec![approval(1_000), approval(1_500), approval(1_300)]
        );
    }

    #[test]
    fn decrease_beyond_allowance_fails() {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("s"), 10).unwrap();
        assert_eq!(
            l.decrease_allowance(addr("alice"), addr("s"), 11),
            Err(LedgerError::InsufficientAllowance { allowance: 10, requested: 11 })
        );
        assert_eq!(l.allowance(&addr("alice"), &addr("s")), 10);
    }

    #[test]
    fn increase_then_decrease_restores() {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("s"), 15).unwrap();
        let before = (l.allowance(&addr("alice"), &addr("s")), l.allowance_holding(&addr("alice")));
        l.increase_allowance(addr("alice"), addr("s"), 7).unwrap();
        l.decrease_allowance(addr("alice"), addr("s"), 7).unwrap();
        let after = (l.allowance(&addr("alice"), &addr("s")), l.allowance_holding(&addr("alice")));
        assert_eq!(before, after);
    }

    #[test]
    fn digest_ignores_insertion_order() {
        let mut a = ledger(1_000, 100);
        let mut b = ledger(1_000, 100);
        a.transfer(addr("owner"), addr("x"), 10).unwrap();
        a.transfer(addr("owner"), addr("y"), 20).unwrap();
        b.transfer(addr("owner"), addr("y"), 20).unwrap();
        b.transfer(addr("owner"), addr("x"), 10).unwrap();
        // Statistics match too: same totals either way.
        assert_eq!(a.state_digest(), b.state_digest());

        b.transfer(addr("x"), addr("y"), 1).unwrap();
        assert_ne!(a.state_digest(), b.state_digest());
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("s"), 40).unwrap();
        let json = serde_json::to_string(&l).unwrap();
        let restored: Ledger = serde_json::from_str(&json).unwrap();
        restored.check_invariants().unwrap();
        assert_eq!(restored.state_digest(), l.state_digest());
        assert_eq!(restored.allowance_holding(&addr("alice")), 4);
    }

    /// Approves 50 at 10% for alice and returns the ledger as JSON.
    fn approved_snapshot() -> (Ledger, serde_json::Value) {
        let mut l = funded("alice", 100, 1_000);
        l.approve(addr("alice"), addr("s"), 50).unwrap();
        let json = serde_json::to_value(&l).unwrap();
        (l, json)
    }

    #[test]
    fn tampered_held_fee_fails_invariants() {
        let (_, mut json) = approved_snapshot();
        let (alice, s) = (addr("alice").to_hex(), addr("s").to_hex());
        // Consistent sum, wrong price.
        json["allowances"]["grants"][&alice][&s]["held_fee"] = serde_json::json!(40);
        json["allowances"]["holdings"][&alice] = serde_json::json!(40);

        let restored: Ledger = serde_json::from_value(json).unwrap();
        assert_eq!(
            restored.check_invariants(),
            Err(InvariantViolation::MispricedGrant {
                owner: addr("alice"),
                spender: addr("s"),
                held_fee: 40,
                expected: 5,
            })
        );
    }

    #[test]
    fn holding_without_grants_fails_invariants() {
        let (_, mut json) = approved_snapshot();
        json["allowances"]["holdings"][addr("ghost").to_hex()] = serde_json::json!(999);

        let restored: Ledger = serde_json::from_value(json).unwrap();
        assert_eq!(
            restored.check_invariants(),
            Err(InvariantViolation::OrphanHolding { owner: addr("ghost"), cached: 999 })
        );
    }

    #[test]
    fn stale_cached_holding_fails_invariants() {
        let (_, mut json) = approved_snapshot();
        json["allowances"]["holdings"][addr("alice").to_hex()] = serde_json::json!(6);

        let restored: Ledger = serde_json::from_value(json).unwrap();
        assert_eq!(
            restored.check_invariants(),
            Err(InvariantViolation::StaleHolding { owner: addr("alice"), cached: 6, expected: 5 })
        );
    }

    #[test]
    fn rate_change_without_repricing_fails_invariants() {
        let (mut l, _) = approved_snapshot();
        l.config.fee_rate_bps = 2_000;
        assert!(matches!(
            l.check_invariants(),
            Err(InvariantViolation::MispricedGrant { held_fee: 5, expected: 10, .. })
        ));
    }

    #[test]
    fn tampered_snapshot_fails_invariants() {
        let mut l = ledger(1_000, 100);
        l.balances.insert(addr("ghost"), 1);
        assert_eq!(
            l.check_invariants(),
            Err(InvariantViolation::SupplyMismatch { sum: 1_001, total_supply: 1_000 })
        );
    }
}
