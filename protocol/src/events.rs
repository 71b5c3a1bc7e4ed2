//! Ledger events.
//!
//! Every successful mutation appends one or more [`LedgerEvent`]s to the
//! ledger's log. Failed calls append nothing. Hosts drain the log after
//! each call and forward it to subscribers.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// A visible state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Principal moved between accounts. The genesis mint comes from
    /// [`Address::ZERO`].
    Transfer {
        from: Address,
        to: Address,
        amount: u64,
    },
    /// A fee was charged to `payer` and credited to the protocol wallet.
    FeeCollected {
        payer: Address,
        wallet: Address,
        fee: u64,
    },
    /// The allowance of `spender` over `owner`'s balance is now `amount`.
    Approval {
        owner: Address,
        spender: Address,
        amount: u64,
    },
    /// `account` joined or left the exemption list.
    ExemptionChanged { account: Address, exempt: bool },
    /// The owner changed the fee rate.
    ProtocolPercChanged { old_bps: u32, new_bps: u32 },
    /// The owner changed the fee recipient.
    ProtocolWalletChanged { old: Address, new: Address },
}
