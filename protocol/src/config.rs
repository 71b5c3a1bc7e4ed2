//! # Ledger Configuration & Constants
//!
//! Every magic number in the ledger lives here, together with the two
//! configuration records the rest of the crate is built from:
//!
//! - [`GenesisConfig`] — the parameters a ledger is created with. Plain
//!   data, loadable from a JSON genesis file.
//! - [`LedgerConfig`] — the mutable configuration a running ledger owns:
//!   who the owner is, where fees go, and the current fee rate. Held by
//!   the ledger explicitly instead of living in globals, so the core can
//!   be exercised in isolation.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// Fee Parameters
// ---------------------------------------------------------------------------

/// Denominator for basis-point arithmetic. 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Highest fee rate the ledger accepts, at creation or on update.
pub const MAX_FEE_BPS: u32 = 10_000;

/// Fee rate used when a genesis file does not specify one: 100 bps (1%).
pub const DEFAULT_FEE_BPS: u32 = 100;

// ---------------------------------------------------------------------------
// Supply Parameters
// ---------------------------------------------------------------------------

/// Supply minted to the creator when a genesis file does not specify one.
pub const DEFAULT_TOTAL_SUPPLY: u64 = 1_000_000;

/// Rejects rates above [`MAX_FEE_BPS`].
pub fn validate_fee_rate(rate_bps: u32) -> LedgerResult<()> {
    if rate_bps > MAX_FEE_BPS {
        return Err(LedgerError::RateTooHigh {
            rate_bps,
            max_bps: MAX_FEE_BPS,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Mutable configuration of a live ledger.
///
/// `owner` is fixed at creation. `protocol_wallet` and `fee_rate_bps` can
/// be changed by the owner through the admin operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The only address allowed to call admin operations.
    pub owner: Address,
    /// Receives every fee charged on a transfer.
    pub protocol_wallet: Address,
    /// Global fee rate in basis points.
    pub fee_rate_bps: u32,
}

impl LedgerConfig {
    /// Checks the config's own bounds.
    pub fn validate(&self) -> LedgerResult<()> {
        validate_fee_rate(self.fee_rate_bps)
    }
}

// ---------------------------------------------------------------------------
// GenesisConfig
// ---------------------------------------------------------------------------

/// Creation parameters for a ledger.
///
/// The whole `total_supply` is minted to `owner`; supply never changes
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Creator of the ledger. Receives the entire supply and becomes owner.
    pub owner: Address,
    /// Initial fee recipient.
    pub protocol_wallet: Address,
    /// Initial fee rate in basis points.
    #[serde(default = "default_fee_bps")]
    pub fee_rate_bps: u32,
    /// Fixed total supply.
    #[serde(default = "default_total_supply")]
    pub total_supply: u64,
}

fn default_fee_bps() -> u32 {
    DEFAULT_FEE_BPS
}

fn default_total_supply() -> u64 {
    DEFAULT_TOTAL_SUPPLY
}

impl GenesisConfig {
    /// Genesis with the default fee rate and supply.
    pub fn new(owner: Address, protocol_wallet: Address) -> Self {
        Self {
            owner,
            protocol_wallet,
            fee_rate_bps: DEFAULT_FEE_BPS,
            total_supply: DEFAULT_TOTAL_SUPPLY,
        }
    }

    /// Overrides the fee rate.
    pub fn with_fee_rate(mut self, fee_rate_bps: u32) -> Self {
        self.fee_rate_bps = fee_rate_bps;
        self
    }

    /// Overrides the total supply.
    pub fn with_total_supply(mut self, total_supply: u64) -> Self {
        self.total_supply = total_supply;
        self
    }

    /// The [`LedgerConfig`] a ledger built from this genesis starts with.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            owner: self.owner,
            protocol_wallet: self.protocol_wallet,
            fee_rate_bps: self.fee_rate_bps,
        }
    }
}
