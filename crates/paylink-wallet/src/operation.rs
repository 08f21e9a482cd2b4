//! Settlement operations
//!
//! Ordered ledger instructions making up one settlement. They are rebuilt from current ledger
//! state for every attempt.

use paylink::{Address, Amount, HoldingAccount};
use serde::{Deserialize, Serialize};

/// Single ledger instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementOperation {
    /// Open a holding account for `owner`, paid for by `funder`
    CreateHoldingAccount {
        /// Account paying the creation cost
        funder: Address,
        /// Owner of the new holding account
        owner: Address,
        /// Derived holding account address
        holding_account: HoldingAccount,
        /// Asset held by the account
        asset_mint: Address,
    },
    /// Move base units between holding accounts
    Transfer {
        /// Debited holding account
        source: HoldingAccount,
        /// Credited holding account
        destination: HoldingAccount,
        /// Owner of `source` authorizing the transfer
        authority: Address,
        /// Base units moved
        amount: Amount,
        /// Asset being moved
        asset_mint: Address,
        /// Fractional digits of the asset
        decimals: u8,
    },
}

impl SettlementOperation {
    /// Short operation name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateHoldingAccount { .. } => "create_holding_account",
            Self::Transfer { .. } => "transfer",
        }
    }

    /// Account that must authorize this operation
    pub fn authority(&self) -> &Address {
        match self {
            Self::CreateHoldingAccount { funder, .. } => funder,
            Self::Transfer { authority, .. } => authority,
        }
    }
}
