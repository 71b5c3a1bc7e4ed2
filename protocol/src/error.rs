//! Error types for ledger operations.
//!
//! Every public ledger call that can fail returns a [`LedgerError`]. A
//! failed call never leaves a partial mutation behind: the ledger checks
//! everything first and only then writes.

use thiserror::Error;

use crate::address::Address;

/// Failure kinds reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The principal alone exceeds the payer's balance.
    #[error("insufficient balance: have {balance}, need {amount}")]
    InsufficientBalance {
        /// The payer's current balance.
        balance: u64,
        /// The requested principal.
        amount: u64,
    },

    /// The principal fits but principal + fee does not.
    #[error("cannot pay fee: balance {balance} covers {amount} but not the {fee} fee on top")]
    CannotPayFee {
        /// The payer's current balance.
        balance: u64,
        /// The requested principal.
        amount: u64,
        /// The fee that would be charged.
        fee: u64,
    },

    /// The delegated amount (or a requested decrease) exceeds the allowance.
    #[error("insufficient allowance: allowed {allowance}, requested {requested}")]
    InsufficientAllowance {
        /// The current allowance for the (owner, spender) pair.
        allowance: u64,
        /// The amount the caller asked for.
        requested: u64,
    },

    /// The account is already on the exemption list.
    #[error("account {0} is already exempt")]
    AlreadyExempt(Address),

    /// The account is not on the exemption list.
    #[error("account {0} is not exempt")]
    NotExempt(Address),

    /// A fee rate above 10000 basis points was requested.
    #[error("fee rate too high: {rate_bps} bps exceeds the {max_bps} bps maximum")]
    RateTooHigh {
        /// The rejected rate.
        rate_bps: u32,
        /// The maximum accepted rate.
        max_bps: u32,
    },

    /// An admin operation was called by someone other than the owner.
    #[error("caller {caller} is not the ledger owner")]
    NotOwner {
        /// The address that attempted the call.
        caller: Address,
    },

    /// Checked arithmetic would have wrapped.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl LedgerError {
    /// Stable machine-readable identifier for this kind of failure.
    ///
    /// Remote callers branch on this rather than on the display text.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::CannotPayFee { .. } => "cannot_pay_fee",
            LedgerError::InsufficientAllowance { .. } => "insufficient_allowance",
            LedgerError::AlreadyExempt(_) => "already_exempt",
            LedgerError::NotExempt(_) => "not_exempt",
            LedgerError::RateTooHigh { .. } => "rate_too_high",
            LedgerError::NotOwner { .. } => "not_owner",
            LedgerError::Overflow(_) => "overflow",
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
