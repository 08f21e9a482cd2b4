//! Ledger addresses
//!
//! Accounts on the settlement ledger are 32 byte identifiers rendered as base58. Holding accounts
//! are derived from an owner and an asset without any network access.

use std::fmt;
use std::str::FromStr;

use bitcoin::base58;
use bitcoin::hashes::{sha256, Hash, HashEngine};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Length in bytes of a ledger address
pub const ADDRESS_LEN: usize = 32;

/// Domain separation tag for holding account derivation
const HOLDING_ACCOUNT_TAG: &[u8] = b"paylink/holding-account/v1";

/// Ledger account identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Create [`Address`] from raw bytes
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = base58::decode(s).map_err(|_| Error::InvalidAddress(s.to_owned()))?;
        let bytes: [u8; ADDRESS_LEN] = decoded
            .try_into()
            .map_err(|_| Error::InvalidAddress(s.to_owned()))?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", base58::encode(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Asset settled on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// Mint address identifying the asset
    pub mint: Address,
    /// Fractional digits of one whole unit
    pub decimals: u8,
    /// Ticker symbol
    pub symbol: String,
}

impl Asset {
    /// Create new [`Asset`]
    pub fn new<S>(mint: Address, decimals: u8, symbol: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            mint,
            decimals,
            symbol: symbol.into(),
        }
    }
}

/// Asset specific account owned by an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldingAccount(Address);

impl HoldingAccount {
    /// Derive the holding account of `owner` for `asset`.
    ///
    /// Pure function of `(owner, asset.mint)`.
    pub fn derive(owner: &Address, asset: &Asset) -> Self {
        let mut engine = sha256::Hash::engine();
        engine.input(HOLDING_ACCOUNT_TAG);
        engine.input(owner.as_bytes());
        engine.input(asset.mint.as_bytes());

        Self(Address(sha256::Hash::from_engine(engine).to_byte_array()))
    }

    /// Address of the holding account
    pub fn address(&self) -> &Address {
        &self.0
    }
}

impl fmt::Display for HoldingAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
