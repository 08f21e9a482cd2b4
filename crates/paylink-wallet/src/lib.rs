//! Paylink settlement engine
//!
//! Turns a [`PaymentIntent`](paylink::PaymentIntent) resolved from a link into a confirmed
//! transfer on a settlement ledger. The ledger and the payer's keys are reached through the
//! [`LedgerConnector`] and [`Signer`] traits.

#![doc = include_str!("../README.md")]

pub mod builder;
pub mod config;
pub mod connector;
pub mod error;
pub mod executor;
pub mod operation;
pub mod signer;
pub mod util;

#[cfg(test)]
mod test_utils;

pub use paylink;

pub use self::builder::{SettlementBuilder, SettlementPlan};
pub use self::config::ExecutorConfig;
pub use self::connector::{AttemptId, Finality, LedgerConnector, SignedBatch, TransactionId};
pub use self::error::{BuildError, Error, ExecutionError, LedgerError, SignerError};
pub use self::executor::{SettlementExecutor, SettlementResult, SettlementStatus};
pub use self::operation::SettlementOperation;
pub use self::signer::Signer;
