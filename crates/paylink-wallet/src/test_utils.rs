#![cfg(test)]
//! Test helpers for the settlement engine

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use paylink::{Address, Amount, Asset, HoldingAccount};
use tokio::sync::Notify;

use crate::connector::{AttemptId, Finality, LedgerConnector, SignedBatch, TransactionId};
use crate::error::{LedgerError, SignerError};
use crate::operation::SettlementOperation;
use crate::signer::Signer;

pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

pub fn payer() -> Address {
    Address::from_bytes([1; 32])
}

pub fn recipient() -> Address {
    Address::from_bytes([2; 32])
}

pub fn asset(decimals: u8) -> Asset {
    Asset::new(Address::from_str(USDC_MINT).unwrap(), decimals, "USDC")
}

#[derive(Debug, Default)]
struct Gate {
    submitted: Notify,
    release: Notify,
}

/// In-memory ledger counting every submission
#[derive(Debug, Default)]
pub struct MockLedger {
    balances: Mutex<HashMap<HoldingAccount, Amount>>,
    pending: Mutex<HashMap<AttemptId, Vec<SettlementOperation>>>,
    non_atomic: bool,
    hang: bool,
    gate: Option<Gate>,
    mutations: AtomicUsize,
    existence_checks: Mutex<Vec<Address>>,
    read_error: Mutex<Option<String>>,
    submit_error: Mutex<Option<LedgerError>>,
    finality: Mutex<Option<Finality>>,
    credit_override: Mutex<Option<Amount>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_atomic_batch(mut self, atomic: bool) -> Self {
        self.non_atomic = !atomic;
        self
    }

    /// Finality never arrives
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Finality waits for [`MockLedger::release`]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Gate::default());
        self
    }

    pub fn set_balance(&self, account: HoldingAccount, amount: u64) {
        self.balances.lock().insert(account, Amount::from(amount));
    }

    pub fn balance(&self, account: &HoldingAccount) -> Option<Amount> {
        self.balances.lock().get(account).copied()
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Addresses passed to `account_exists`, in order
    pub fn existence_checks(&self) -> Vec<Address> {
        self.existence_checks.lock().clone()
    }

    pub fn fail_reads(&self, reason: &str) {
        *self.read_error.lock() = Some(reason.to_string());
    }

    pub fn fail_submit(&self, err: LedgerError) {
        *self.submit_error.lock() = Some(err);
    }

    pub fn set_finality(&self, finality: Finality) {
        *self.finality.lock() = Some(finality);
    }

    pub fn clear_finality(&self) {
        *self.finality.lock() = None;
    }

    /// Credit recipients with `amount` regardless of the transfer
    pub fn set_credit_override(&self, amount: Amount) {
        *self.credit_override.lock() = Some(amount);
    }

    pub async fn wait_submitted(&self) {
        if let Some(gate) = &self.gate {
            gate.submitted.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.release.notify_one();
        }
    }

    fn check_reads(&self) -> Result<(), LedgerError> {
        match self.read_error.lock().clone() {
            Some(reason) => Err(LedgerError::Client(reason)),
            None => Ok(()),
        }
    }

    fn apply(&self, operations: &[SettlementOperation]) -> Option<String> {
        let credit_override = *self.credit_override.lock();
        let mut balances = self.balances.lock();

        for op in operations {
            match op {
                SettlementOperation::CreateHoldingAccount {
                    holding_account, ..
                } => {
                    balances.entry(*holding_account).or_insert(Amount::ZERO);
                }
                SettlementOperation::Transfer {
                    source,
                    destination,
                    amount,
                    ..
                } => {
                    let Some(remaining) = balances
                        .get(source)
                        .and_then(|balance| balance.checked_sub(*amount))
                    else {
                        return Some("insufficient funds".to_string());
                    };
                    balances.insert(*source, remaining);

                    let credit = credit_override.unwrap_or(*amount);
                    let Some(current) = balances.get(destination).copied() else {
                        return Some("account not found".to_string());
                    };
                    let Some(credited) = current.checked_add(credit) else {
                        return Some("amount overflow".to_string());
                    };
                    balances.insert(*destination, credited);
                }
            }
        }

        None
    }
}

#[async_trait]
impl LedgerConnector for MockLedger {
    async fn account_exists(&self, address: &Address) -> Result<bool, LedgerError> {
        self.check_reads()?;
        self.existence_checks.lock().push(*address);
        Ok(self
            .balances
            .lock()
            .keys()
            .any(|account| account.address() == address))
    }

    async fn get_balance(&self, account: &HoldingAccount) -> Result<Option<Amount>, LedgerError> {
        self.check_reads()?;
        Ok(self.balance(account))
    }

    fn supports_atomic_batch(&self) -> bool {
        !self.non_atomic
    }

    async fn submit(&self, batch: SignedBatch) -> Result<AttemptId, LedgerError> {
        if let Some(err) = self.submit_error.lock().clone() {
            return Err(err);
        }

        let count = self.mutations.fetch_add(1, Ordering::SeqCst) + 1;
        let attempt = AttemptId::new(format!("attempt-{count}"));
        self.pending.lock().insert(attempt.clone(), batch.operations);
        Ok(attempt)
    }

    async fn await_finality(
        &self,
        attempt: &AttemptId,
        _timeout: Duration,
    ) -> Result<Finality, LedgerError> {
        if let Some(gate) = &self.gate {
            gate.submitted.notify_one();
            gate.release.notified().await;
        }

        if self.hang {
            std::future::pending::<()>().await;
        }

        let finality = self.finality.lock().clone();
        if let Some(finality) = finality {
            return Ok(finality);
        }

        let operations = self
            .pending
            .lock()
            .remove(attempt)
            .ok_or_else(|| LedgerError::Client(format!("unknown attempt {attempt}")))?;

        match self.apply(&operations) {
            Some(reason) => Ok(Finality::Rejected(reason)),
            None => Ok(Finality::Finalized(TransactionId::new(
                attempt.as_str().replace("attempt", "tx"),
            ))),
        }
    }
}

/// Signer that approves or rejects everything
#[derive(Debug)]
pub struct MockSigner {
    identity: Address,
    reject: bool,
}

impl MockSigner {
    pub fn new() -> Self {
        Self {
            identity: payer(),
            reject: false,
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn identity(&self) -> Address {
        self.identity
    }

    async fn sign(&self, operations: &[SettlementOperation]) -> Result<SignedBatch, SignerError> {
        if self.reject {
            return Err(SignerError::Rejected);
        }

        Ok(SignedBatch {
            signer: self.identity,
            operations: operations.to_vec(),
            payload: Vec::new(),
        })
    }
}
