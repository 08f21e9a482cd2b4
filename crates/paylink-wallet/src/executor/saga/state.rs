//! State types for the settlement saga.
//!
//! # Type State Flow
//!
//! ```text
//! Idle
//!   └─> submit() -> Processing
//!   │                 └─> confirm() -> Finalized (success or failed)
//!   └─> submit() -> Finalized (failed, signing or submission refused)
//! ```

use paylink::Amount;

use crate::builder::SettlementPlan;
use crate::connector::AttemptId;

/// Idle state - plan built, nothing signed or submitted.
#[derive(Debug)]
pub struct Idle {
    /// Operations for this attempt
    pub plan: SettlementPlan,
}

/// Processing state - batch accepted by the ledger, awaiting finality.
#[derive(Debug)]
pub struct Processing {
    /// Operations for this attempt
    pub plan: SettlementPlan,
    /// Ledger submission id
    pub submission_id: AttemptId,
    /// Recipient balance before submission, when verification is enabled
    pub pre_balance: Option<Amount>,
}

/// Finalized state - terminal, see the result snapshot for the outcome.
#[derive(Debug)]
pub struct Finalized;
