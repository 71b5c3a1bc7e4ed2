//! Owner-gated administration.
//!
//! Fee rate, fee recipient, and the exemption list can only be changed by
//! the ledger owner. Ownership is checked before anything else, so a
//! non-owner learns nothing about whether its arguments would have been
//! valid.
//!
//! Changing an exemption or the fee rate reprices the affected allowance
//! holdings, since a holding is the fee an owner would pay *under current
//! terms*.

use tracing::{debug, warn};

use crate::address::Address;
use crate::config::validate_fee_rate;
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::fee::FeePolicy;
use crate::ledger::Ledger;

impl Ledger {
    fn ensure_owner(&self, caller: &Address, op: &'static str) -> LedgerResult<()> {
        if *caller != self.config.owner {
            warn!(%caller, op, "admin call rejected: not owner");
            return Err(LedgerError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    /// Replaces the global fee rate.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`] for any caller but the owner,
    /// [`LedgerError::RateTooHigh`] above 10_000 bps.
    pub fn set_protocol_perc(&mut self, caller: Address, new_rate_bps: u32) -> LedgerResult<()> {
        self.ensure_owner(&caller, "set_protocol_perc")?;
        validate_fee_rate(new_rate_bps)?;

        let old_bps = self.config.fee_rate_bps;
        self.config.fee_rate_bps = new_rate_bps;

        let policy = FeePolicy::from_validated(new_rate_bps);
        let owners: Vec<Address> = self.allowances.owners().copied().collect();
        for owner in owners {
            let exempt = self.exemptions.is_exempt(&owner);
            self.allowances.reprice_owner(owner, &policy, exempt);
        }

        self.events.push(LedgerEvent::ProtocolPercChanged {
            old_bps,
            new_bps: new_rate_bps,
        });
        debug!(old_bps, new_bps = new_rate_bps, "fee rate changed");
        Ok(())
    }

    /// Replaces the fee recipient. Any address is accepted.
    pub fn set_protocol_wallet(&mut self, caller: Address, new_wallet: Address) -> LedgerResult<()> {
        self.ensure_owner(&caller, "set_protocol_wallet")?;

        let old = self.config.protocol_wallet;
        self.config.protocol_wallet = new_wallet;
        self.events.push(LedgerEvent::ProtocolWalletChanged {
            old,
            new: new_wallet,
        });
        debug!(%old, new = %new_wallet, "protocol wallet changed");
        Ok(())
    }

    /// Exempts `account` from transfer fees.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`], or [`LedgerError::AlreadyExempt`] if the
    /// account is already exempt.
    pub fn add_exempt(&mut self, caller: Address, account: Address) -> LedgerResult<()> {
        self.ensure_owner(&caller, "add_exempt")?;
        self.exemptions.add(account)?;
        self.after_exemption_change(account, true);
        Ok(())
    }

    /// Removes `account`'s fee exemption.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`], or [`LedgerError::NotExempt`] if the
    /// account was not exempt.
    pub fn remove_exempt(&mut self, caller: Address, account: Address) -> LedgerResult<()> {
        self.ensure_owner(&caller, "remove_exempt")?;
        self.exemptions.remove(account)?;
        self.after_exemption_change(account, false);
        Ok(())
    }

    fn after_exemption_change(&mut self, account: Address, exempt: bool) {
        let policy = self.fee_policy();
        self.allowances.reprice_owner(account, &policy, exempt);
        self.events
            .push(LedgerEvent::ExemptionChanged { account, exempt });
        debug!(%account, exempt, "exemption changed");
    }
}
