//! Settlement builder
//!
//! Turns a validated [`PaymentIntent`] into the ordered operations for one attempt. Only reads
//! ledger state, never submits.

use paylink::{Address, Amount, Asset, HoldingAccount, PaymentIntent};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::connector::LedgerConnector;
use crate::error::BuildError;
use crate::operation::SettlementOperation;

/// Operations and context for one settlement attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Operations in application order
    pub operations: Vec<SettlementOperation>,
    /// Base units moved to the recipient
    pub required: Amount,
    /// Payer holding account
    pub payer_holding: HoldingAccount,
    /// Recipient holding account
    pub recipient_holding: HoldingAccount,
    /// The plan opens the recipient holding account
    pub creates_recipient_account: bool,
}

/// Builds [`SettlementPlan`]s for one asset
#[derive(Debug, Clone)]
pub struct SettlementBuilder {
    asset: Asset,
}

impl SettlementBuilder {
    /// Create new [`SettlementBuilder`]
    pub fn new(asset: Asset) -> Self {
        Self { asset }
    }

    /// Asset being settled
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Build the plan paying `intent` from `payer`
    #[instrument(skip_all, fields(recipient = %intent.recipient, payer = %payer))]
    pub async fn build(
        &self,
        intent: &PaymentIntent,
        payer: &Address,
        ledger: &dyn LedgerConnector,
    ) -> Result<SettlementPlan, BuildError> {
        intent.validate()?;

        let payer_holding = HoldingAccount::derive(payer, &self.asset);
        let recipient_holding = HoldingAccount::derive(&intent.recipient, &self.asset);

        let available = ledger
            .get_balance(&payer_holding)
            .await?
            .ok_or(BuildError::PayerAccountMissing(payer_holding))?;

        let required = Amount::from_decimal_truncated(intent.amount, self.asset.decimals)
            .map_err(|err| BuildError::InvalidAmount(format!("{}: {err}", intent.amount)))?;
        if required == Amount::ZERO {
            return Err(BuildError::InvalidAmount(intent.amount.to_string()));
        }

        if available < required {
            tracing::debug!(
                "Payer holds {} base units, {} required",
                available,
                required
            );
            return Err(BuildError::InsufficientBalance {
                required,
                available,
            });
        }

        let mut operations = Vec::with_capacity(2);

        let creates_recipient_account = !ledger
            .account_exists(recipient_holding.address())
            .await?;
        if creates_recipient_account {
            tracing::debug!(
                "Recipient holding account {} missing, payer funds creation",
                recipient_holding
            );
            operations.push(SettlementOperation::CreateHoldingAccount {
                funder: *payer,
                owner: intent.recipient,
                holding_account: recipient_holding,
                asset_mint: self.asset.mint,
            });
        }

        operations.push(SettlementOperation::Transfer {
            source: payer_holding,
            destination: recipient_holding,
            authority: *payer,
            amount: required,
            asset_mint: self.asset.mint,
            decimals: self.asset.decimals,
        });

        if operations.len() > 1 && !ledger.supports_atomic_batch() {
            return Err(BuildError::AtomicityUnsupported);
        }

        Ok(SettlementPlan {
            operations,
            required,
            payer_holding,
            recipient_holding,
            creates_recipient_account,
        })
    }
}
