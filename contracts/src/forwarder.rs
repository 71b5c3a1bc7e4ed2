//! # Forwarder
//!
//! An intermediary account that receives tokens and passes them on to a
//! fixed destination. A naive forwarder that sends its whole balance fails
//! with `CannotPayFee` whenever it is not fee-exempt, because the fee comes
//! on top of the principal. This one sizes the principal so that principal
//! plus fee fits the balance.
//!
//! The forwarder holds no custody of its own: it is an address plus a
//! destination, and every move is an ordinary `Ledger::transfer` from that
//! address.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use comrade_protocol::{Address, Ledger, LedgerError, TransferReceipt};

use crate::fee_math::max_principal_within;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from forwarding or budgeted sends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    /// The sender cannot cover even a one-token principal.
    #[error("nothing to forward from {account}: balance {balance}")]
    NothingToForward {
        /// The sending account.
        account: Address,
        /// Its balance at the time of the call.
        balance: u64,
    },

    /// The ledger rejected the transfer.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Forwarder
// ---------------------------------------------------------------------------

/// Passes funds received at `account` on to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forwarder {
    account: Address,
    destination: Address,
}

impl Forwarder {
    pub fn new(account: Address, destination: Address) -> Self {
        Self {
            account,
            destination,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    /// The largest principal the forwarder can send right now.
    pub fn forwardable(&self, ledger: &Ledger) -> u64 {
        spendable(ledger, &self.account, ledger.balance_of(&self.account))
    }

    /// Sends everything the balance covers to the destination.
    ///
    /// When the forwarder is exempt this is its whole balance; otherwise
    /// the principal is grossed down so the fee fits.
    pub fn forward_all(&self, ledger: &mut Ledger) -> Result<TransferReceipt, ForwardError> {
        self.forward(ledger, u64::MAX)
    }

    /// Sends `net` to the destination, or as much of it as the balance
    /// covers once the fee is accounted for.
    pub fn forward(&self, ledger: &mut Ledger, net: u64) -> Result<TransferReceipt, ForwardError> {
        let principal = net.min(self.forwardable(ledger));
        if principal == 0 {
            return Err(ForwardError::NothingToForward {
                account: self.account,
                balance: ledger.balance_of(&self.account),
            });
        }

        let receipt = ledger.transfer(self.account, self.destination, principal)?;
        debug!(
            from = %self.account,
            to = %self.destination,
            requested = net,
            amount = receipt.amount,
            fee = receipt.fee,
            "forwarded"
        );
        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// Budgeted Sends
// ---------------------------------------------------------------------------

/// Largest principal `payer` can send when it is willing to spend `budget`
/// in total, fee included.
fn spendable(ledger: &Ledger, payer: &Address, budget: u64) -> u64 {
    let rate = if ledger.is_exempt(payer) {
        0
    } else {
        ledger.protocol_perc()
    };
    max_principal_within(budget, rate)
}

/// Transfers from `from` to `to` the largest principal whose cost, fee
/// included, stays within `budget`.
///
/// A budget above the sender's balance is capped at the balance.
pub fn send_with_budget(
    ledger: &mut Ledger,
    from: Address,
    to: Address,
    budget: u64,
) -> Result<TransferReceipt, ForwardError> {
    let balance = ledger.balance_of(&from);
    let principal = spendable(ledger, &from, budget.min(balance));
    if principal == 0 {
        return Err(ForwardError::NothingToForward {
            account: from,
            balance,
        });
    }
    Ok(ledger.transfer(from, to, principal)?)
}
