//! # Account Addresses
//!
//! Every balance, allowance and statistic in the ledger is keyed by an
//! [`Address`]: a 20-byte account identifier. On the wire and in snapshots
//! an address is a `0x`-prefixed lowercase hex string, so it works as a
//! JSON map key without any custom map adapters.
//!
//! The ledger never authenticates an address. Whoever submits a call
//! names the caller; proving that claim belongs to the host.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string is not valid hex.
    #[error("invalid address hex: {0}")]
    InvalidHex(String),

    /// The hex decoded to the wrong number of bytes.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// A 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Used as the `from` side of the genesis mint.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Derives a deterministic address from a human-readable label.
    ///
    /// The address is the first 20 bytes of `BLAKE3(label)`. Handy for
    /// demos, tests and genesis files where nobody wants to type hex.
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    /// Parses an address from hex, with or without a `0x` prefix.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Returns the `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "Address(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
