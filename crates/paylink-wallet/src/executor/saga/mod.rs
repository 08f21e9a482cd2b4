//! Settlement Saga - Type State Pattern Implementation
//!
//! One saga drives one attempt. The typestate makes it impossible to reach a terminal state from
//! [`Idle`] without passing through processing, and the [`SettlementResult`] snapshot carried
//! along records every transition.
//!
//! # States
//!
//! | State | Description |
//! |-------|-------------|
//! | `Idle` | Plan built, nothing signed |
//! | `Processing` | Batch accepted by the ledger, waiting for finality |
//! | `Finalized` | Success or failed, immutable |

use paylink::Amount;
use tracing::instrument;

use self::state::{Finalized, Idle, Processing};
use crate::builder::SettlementPlan;
use crate::config::ExecutorConfig;
use crate::connector::{Finality, LedgerConnector, TransactionId};
use crate::error::{Error, ExecutionError};
use crate::executor::result::SettlementResult;
use crate::signer::Signer;

pub(crate) mod state;

/// Result of submitting an idle saga
pub(crate) enum SubmitOutcome<'a> {
    /// Ledger accepted the batch
    Accepted(SettlementSaga<'a, Processing>),
    /// Signing or submission failed, nothing landed
    Failed(SettlementSaga<'a, Finalized>),
}

/// Saga pattern implementation for settlement attempts.
pub(crate) struct SettlementSaga<'a, S> {
    ledger: &'a dyn LedgerConnector,
    signer: &'a dyn Signer,
    config: &'a ExecutorConfig,
    result: SettlementResult,
    state_data: S,
}

impl<'a> SettlementSaga<'a, Idle> {
    /// Create a new saga for `plan`
    pub fn new(
        ledger: &'a dyn LedgerConnector,
        signer: &'a dyn Signer,
        config: &'a ExecutorConfig,
        plan: SettlementPlan,
    ) -> Self {
        Self {
            ledger,
            signer,
            config,
            result: SettlementResult::new(),
            state_data: Idle { plan },
        }
    }

    /// Sign and submit the plan.
    ///
    /// Enters processing before signing, so a refused signature or submission ends as a failed
    /// attempt.
    #[instrument(skip_all, fields(attempt_id = %self.result.attempt_id))]
    pub async fn submit(self) -> Result<SubmitOutcome<'a>, Error> {
        let Self {
            ledger,
            signer,
            config,
            mut result,
            state_data: Idle { plan },
        } = self;

        let pre_balance = if config.verify_balance {
            match ledger.get_balance(&plan.recipient_holding).await {
                Ok(balance) => Some(balance.unwrap_or(Amount::ZERO)),
                Err(err) => {
                    tracing::warn!(
                        "Could not read recipient balance, skipping verification: {}",
                        err
                    );
                    None
                }
            }
        } else {
            None
        };

        result.mark_processing(None)?;

        let submitted = match signer.sign(&plan.operations).await {
            Ok(batch) => ledger.submit(batch).await.map_err(|err| {
                tracing::warn!("Ledger refused submission: {}", err);
                ExecutionError::from(err)
            }),
            Err(err) => {
                tracing::info!("Signer refused settlement: {}", err);
                Err(ExecutionError::from(err))
            }
        };

        match submitted {
            Ok(submission_id) => {
                tracing::debug!(
                    "Submitted {} operations as {}",
                    plan.operations.len(),
                    submission_id
                );
                result.set_submission_id(submission_id.clone())?;

                Ok(SubmitOutcome::Accepted(SettlementSaga {
                    ledger,
                    signer,
                    config,
                    result,
                    state_data: Processing {
                        plan,
                        submission_id,
                        pre_balance,
                    },
                }))
            }
            Err(error) => SettlementSaga {
                ledger,
                signer,
                config,
                result,
                state_data: Finalized,
            }
            .fail(error, None)
            .map(SubmitOutcome::Failed),
        }
    }
}

impl<'a> SettlementSaga<'a, Processing> {
    /// Wait for finality, bounded by the configured timeout
    #[instrument(skip_all, fields(attempt_id = %self.result.attempt_id))]
    pub async fn confirm(self) -> Result<SettlementSaga<'a, Finalized>, Error> {
        let timeout = self.config.finality_timeout();
        let submission_id = self.state_data.submission_id.clone();

        let outcome = tokio::time::timeout(
            timeout,
            self.ledger.await_finality(&submission_id, timeout),
        )
        .await;

        let finality = match outcome {
            Ok(Ok(finality)) => finality,
            Ok(Err(err)) => {
                tracing::warn!("Finality check for {} failed: {}", submission_id, err);
                return self.fail(ExecutionError::from(err), None);
            }
            Err(_) => {
                tracing::warn!(
                    "No finality for {} after {}s",
                    submission_id,
                    timeout.as_secs()
                );
                return self.fail(ExecutionError::NetworkTimeout, None);
            }
        };

        match finality {
            Finality::Finalized(transaction_id) => self.verify(transaction_id).await,
            Finality::Rejected(reason) => {
                tracing::info!("Ledger rejected {}: {}", submission_id, reason);
                self.fail(ExecutionError::classify(&reason), None)
            }
            Finality::TimedOut => self.fail(ExecutionError::NetworkTimeout, None),
        }
    }

    async fn verify(
        self,
        transaction_id: TransactionId,
    ) -> Result<SettlementSaga<'a, Finalized>, Error> {
        let Some(pre_balance) = self.state_data.pre_balance else {
            return self.succeed(transaction_id);
        };

        let expected = self.state_data.plan.required;
        let balance = self
            .ledger
            .get_balance(&self.state_data.plan.recipient_holding)
            .await;

        let post_balance = match balance {
            Ok(balance) => balance.unwrap_or(Amount::ZERO),
            Err(err) => {
                tracing::warn!(
                    "Could not verify recipient balance for {}: {}",
                    transaction_id,
                    err
                );
                return self.succeed(transaction_id);
            }
        };

        let observed = post_balance
            .checked_sub(pre_balance)
            .unwrap_or(Amount::ZERO);
        if observed < expected {
            tracing::error!(
                "Transaction {} landed but recipient received {} of {}",
                transaction_id,
                observed,
                expected
            );
            return self.fail(
                ExecutionError::BalanceMismatch { expected, observed },
                Some(transaction_id),
            );
        }

        self.succeed(transaction_id)
    }

    fn succeed(
        mut self,
        transaction_id: TransactionId,
    ) -> Result<SettlementSaga<'a, Finalized>, Error> {
        tracing::info!("Settlement finalized as {}", transaction_id);
        self.result.mark_success(transaction_id)?;
        Ok(self.finalize())
    }
}

impl<'a, S> SettlementSaga<'a, S> {
    fn fail(
        mut self,
        error: ExecutionError,
        transaction_id: Option<TransactionId>,
    ) -> Result<SettlementSaga<'a, Finalized>, Error> {
        self.result.mark_failed(error, transaction_id)?;
        Ok(self.finalize())
    }

    fn finalize(self) -> SettlementSaga<'a, Finalized> {
        SettlementSaga {
            ledger: self.ledger,
            signer: self.signer,
            config: self.config,
            result: self.result,
            state_data: Finalized,
        }
    }
}

impl SettlementSaga<'_, Finalized> {
    /// Terminal snapshot
    pub fn into_result(self) -> SettlementResult {
        self.result
    }
}
