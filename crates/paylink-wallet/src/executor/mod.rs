//! Settlement executor
//!
//! Drives a [`PaymentIntent`] to a terminal [`SettlementResult`]:
//!
//! ```text
//! Idle ──► Processing ──► Success
//!                    └──► Failed
//! ```
//!
//! Only one attempt per intent and payer runs at a time. Retries are never automatic, the caller
//! decides when to [`SettlementExecutor::retry`] a failed attempt.
//!
//! Dropping the future returned by [`SettlementExecutor::execute`] stops local tracking and
//! releases the intent, but a batch already submitted to the ledger is not revoked.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use paylink::{Address, Asset, PaymentIntent};
use tracing::instrument;

use self::saga::{SettlementSaga, SubmitOutcome};
use crate::builder::{SettlementBuilder, SettlementPlan};
use crate::config::ExecutorConfig;
use crate::connector::LedgerConnector;
use crate::error::Error;
use crate::signer::Signer;

mod result;
mod saga;

pub use self::result::{SettlementResult, SettlementStatus, Transition};

type FlightKey = (Address, PaymentIntent);

/// Settlement executor
#[derive(Debug, Clone)]
pub struct SettlementExecutor {
    ledger: Arc<dyn LedgerConnector>,
    signer: Arc<dyn Signer>,
    builder: SettlementBuilder,
    config: ExecutorConfig,
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
}

/// Removes its key from the in-flight set when dropped
#[derive(Debug)]
struct FlightGuard {
    in_flight: Arc<Mutex<HashSet<FlightKey>>>,
    key: FlightKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

impl SettlementExecutor {
    /// Create new [`SettlementExecutor`]
    pub fn new(
        ledger: Arc<dyn LedgerConnector>,
        signer: Arc<dyn Signer>,
        asset: Asset,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            ledger,
            signer,
            builder: SettlementBuilder::new(asset),
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Asset being settled
    pub fn asset(&self) -> &Asset {
        self.builder.asset()
    }

    /// Whether an attempt for `intent` from this payer is processing
    pub fn in_flight(&self, intent: &PaymentIntent) -> bool {
        let key = (self.signer.identity(), intent.clone());
        self.in_flight.lock().contains(&key)
    }

    /// Build the plan `execute` would submit, without submitting it
    pub async fn plan(&self, intent: &PaymentIntent) -> Result<SettlementPlan, Error> {
        let payer = self.signer.identity();
        Ok(self
            .builder
            .build(intent, &payer, self.ledger.as_ref())
            .await?)
    }

    fn acquire(&self, intent: &PaymentIntent, payer: Address) -> Result<FlightGuard, Error> {
        let key = (payer, intent.clone());
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(key.clone()) {
            return Err(Error::AttemptInProgress);
        }

        Ok(FlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// Pay `intent`.
    ///
    /// The plan is rebuilt from current ledger state on every call. Build failures are returned
    /// as [`Error::Build`] before anything is signed. Once submission starts every outcome is
    /// reported in the returned [`SettlementResult`].
    #[instrument(skip_all, fields(recipient = %intent.recipient, amount = %intent.amount))]
    pub async fn execute(&self, intent: &PaymentIntent) -> Result<SettlementResult, Error> {
        let payer = self.signer.identity();
        let _guard = self.acquire(intent, payer)?;

        let plan = self
            .builder
            .build(intent, &payer, self.ledger.as_ref())
            .await?;
        tracing::debug!(
            "Built settlement with {} operations for {} base units",
            plan.operations.len(),
            plan.required
        );

        let saga = SettlementSaga::new(
            self.ledger.as_ref(),
            self.signer.as_ref(),
            &self.config,
            plan,
        );

        let finalized = match saga.submit().await? {
            SubmitOutcome::Accepted(processing) => processing.confirm().await?,
            SubmitOutcome::Failed(failed) => failed,
        };

        let result = finalized.into_result();
        match &result.error {
            None => tracing::info!("Payment {} settled", result.attempt_id),
            Some(err) => tracing::warn!("Payment {} failed: {}", result.attempt_id, err),
        }

        Ok(result)
    }

    /// Start a fresh attempt after `previous` failed.
    ///
    /// Returns [`Error::InvalidTransition`] unless `previous` is failed. When the previous error
    /// is not a definitive failure the batch may still land, so callers should check the ledger
    /// first.
    #[instrument(skip_all, fields(previous = %previous.attempt_id))]
    pub async fn retry(
        &self,
        intent: &PaymentIntent,
        previous: &SettlementResult,
    ) -> Result<SettlementResult, Error> {
        if previous.status != SettlementStatus::Failed {
            return Err(Error::InvalidTransition {
                from: previous.status,
                to: SettlementStatus::Processing,
            });
        }

        if let Some(err) = previous.error.as_ref().filter(|e| !e.is_definitive_failure()) {
            tracing::warn!("Retrying after ambiguous failure: {}", err);
        }

        self.execute(intent).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::time::Duration;

    use paylink::rust_decimal::Decimal;
    use paylink::{Amount, HoldingAccount};

    use super::*;
    use crate::connector::{Finality, TransactionId};
    use crate::error::{BuildError, ExecutionError, LedgerError};
    use crate::test_utils::{asset, payer, recipient, MockLedger, MockSigner};

    fn intent() -> PaymentIntent {
        PaymentIntent::builder()
            .recipient(recipient())
            .amount(Decimal::from_str("12.50").unwrap())
            .label("Dinner")
            .build()
            .unwrap()
    }

    fn funded_ledger() -> MockLedger {
        let ledger = MockLedger::new();
        let asset = asset(6);
        ledger.set_balance(HoldingAccount::derive(&payer(), &asset), 100_000_000);
        ledger.set_balance(HoldingAccount::derive(&recipient(), &asset), 0);
        ledger
    }

    fn executor(
        ledger: Arc<MockLedger>,
        signer: MockSigner,
        config: ExecutorConfig,
    ) -> SettlementExecutor {
        SettlementExecutor::new(ledger, Arc::new(signer), asset(6), config)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let ledger = Arc::new(funded_ledger());
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let result = executor.execute(&intent()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.transaction_id, Some(TransactionId::new("tx-1")));
        assert_eq!(
            result.statuses(),
            vec![
                SettlementStatus::Idle,
                SettlementStatus::Processing,
                SettlementStatus::Success
            ]
        );
        assert_eq!(ledger.mutations(), 1);
        assert!(!executor.in_flight(&intent()));
    }

    #[tokio::test]
    async fn test_build_error_has_no_side_effects() {
        let ledger = Arc::new(MockLedger::new());
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let err = executor.execute(&intent()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Build(BuildError::PayerAccountMissing(_))
        ));
        assert_eq!(ledger.mutations(), 0);
        assert!(!executor.in_flight(&intent()));
    }

    #[tokio::test]
    async fn test_signer_rejection() {
        let ledger = Arc::new(funded_ledger());
        let executor = executor(
            ledger.clone(),
            MockSigner::new().rejecting(),
            ExecutorConfig::default(),
        );

        let result = executor.execute(&intent()).await.unwrap();

        assert!(result.is_failed());
        assert_eq!(result.error, Some(ExecutionError::UserRejected));
        assert_eq!(
            result.statuses(),
            vec![
                SettlementStatus::Idle,
                SettlementStatus::Processing,
                SettlementStatus::Failed
            ]
        );
        assert_eq!(ledger.mutations(), 0);
    }

    #[tokio::test]
    async fn test_submit_failure_classified() {
        let ledger = Arc::new(funded_ledger());
        ledger.fail_submit(LedgerError::Client(
            "Transfer: insufficient funds for fee".to_string(),
        ));
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let result = executor.execute(&intent()).await.unwrap();

        assert_eq!(result.error, Some(ExecutionError::InsufficientFunds));
        assert!(result.submission_id.is_none());
    }

    #[tokio::test]
    async fn test_rejected_finality_classified() {
        let ledger = Arc::new(funded_ledger());
        ledger.set_finality(Finality::Rejected("custom program error: 0x1".to_string()));
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let result = executor.execute(&intent()).await.unwrap();

        assert_eq!(
            result.error,
            Some(ExecutionError::Unknown("custom program error: 0x1".to_string()))
        );
        assert!(result.submission_id.is_some());
        assert!(result.transaction_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finality_timeout() {
        let ledger = Arc::new(funded_ledger().hanging());
        let config = ExecutorConfig::default().with_finality_timeout(Duration::from_secs(30));
        let executor = executor(ledger.clone(), MockSigner::new(), config);

        let result = executor.execute(&intent()).await.unwrap();

        assert_eq!(result.error, Some(ExecutionError::NetworkTimeout));
        assert!(!result.error.as_ref().unwrap().is_definitive_failure());
        assert_eq!(ledger.mutations(), 1);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let ledger = Arc::new(funded_ledger().gated());
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(&intent()).await })
        };

        ledger.wait_submitted().await;
        assert!(executor.in_flight(&intent()));

        let err = executor.execute(&intent()).await.unwrap_err();
        assert!(matches!(err, Error::AttemptInProgress));

        ledger.release();
        let result = first.await.unwrap().unwrap();
        assert!(result.is_success());
        assert_eq!(ledger.mutations(), 1);
        assert!(!executor.in_flight(&intent()));
    }

    #[tokio::test]
    async fn test_dropped_attempt_releases_intent() {
        let ledger = Arc::new(funded_ledger().gated());
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(&intent()).await })
        };

        ledger.wait_submitted().await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        assert!(!executor.in_flight(&intent()));
        // Submitted batch is not revoked
        assert_eq!(ledger.mutations(), 1);
    }

    #[tokio::test]
    async fn test_retry_only_from_failed() {
        let ledger = Arc::new(funded_ledger());
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let success = executor.execute(&intent()).await.unwrap();
        let err = executor.retry(&intent(), &success).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: SettlementStatus::Success,
                to: SettlementStatus::Processing
            }
        ));
        assert_eq!(ledger.mutations(), 1);
    }

    #[tokio::test]
    async fn test_retry_rebuilds_fresh() {
        let ledger = Arc::new(funded_ledger());
        ledger.set_finality(Finality::Rejected("User rejected the request".to_string()));
        let executor = executor(ledger.clone(), MockSigner::new(), ExecutorConfig::default());

        let failed = executor.execute(&intent()).await.unwrap();
        assert_eq!(failed.error, Some(ExecutionError::UserRejected));

        ledger.clear_finality();
        let retried = executor.retry(&intent(), &failed).await.unwrap();

        assert!(retried.is_success());
        assert_ne!(retried.attempt_id, failed.attempt_id);
        assert_eq!(ledger.mutations(), 2);
    }

    #[tokio::test]
    async fn test_balance_mismatch_keeps_transaction() {
        let ledger = Arc::new(funded_ledger());
        ledger.set_credit_override(Amount::from(1_000_000));
        let config = ExecutorConfig::default().with_verify_balance(true);
        let executor = executor(ledger.clone(), MockSigner::new(), config);

        let result = executor.execute(&intent()).await.unwrap();

        assert!(result.is_failed());
        assert_eq!(
            result.error,
            Some(ExecutionError::BalanceMismatch {
                expected: Amount::from(12_500_000),
                observed: Amount::from(1_000_000),
            })
        );
        assert!(result.error.as_ref().unwrap().landed());
        assert_eq!(result.transaction_id, Some(TransactionId::new("tx-1")));
    }

    #[tokio::test]
    async fn test_verified_balance() {
        let ledger = Arc::new(funded_ledger());
        let config = ExecutorConfig::default().with_verify_balance(true);
        let executor = executor(ledger.clone(), MockSigner::new(), config);

        let result = executor.execute(&intent()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(
            ledger.balance(&HoldingAccount::derive(&recipient(), &asset(6))),
            Some(Amount::from(12_500_000))
        );
    }
}
