//! Paylink Fake Ledger
//!
//! In-memory [`LedgerConnector`] and [`Signer`] for tests and demos. Balances live in a map of
//! holding accounts, submissions settle after a configurable delay, and failures can be injected
//! with a [`FakeLedgerBehavior`].

#![doc = include_str!("../README.md")]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::hashes::{sha256, Hash};
use error::Error;
use paylink::{Address, Amount, Asset, HoldingAccount};
use paylink_wallet::{
    AttemptId, Finality, LedgerConnector, LedgerError, SettlementOperation, SignedBatch, Signer,
    SignerError, TransactionId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time;
use tracing::instrument;
use uuid::Uuid;

pub mod error;

/// Failure injection for the next submissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeLedgerBehavior {
    /// Refuse submissions with this client error
    pub submit_err: Option<String>,
    /// Reject at finality with this diagnostic
    pub reject_with: Option<String>,
    /// Never finalize, report a timeout once the wait elapses
    pub time_out: bool,
    /// Credit recipients with this many base units instead of the transfer amount
    pub short_credit: Option<Amount>,
}

#[derive(Debug, Default)]
struct Accounts {
    owners: HashSet<Address>,
    balances: HashMap<HoldingAccount, Amount>,
}

/// In-memory ledger
#[derive(Debug, Clone)]
pub struct FakeLedger {
    accounts: Arc<RwLock<Accounts>>,
    pending: Arc<Mutex<HashMap<AttemptId, Vec<SettlementOperation>>>>,
    behavior: Arc<Mutex<FakeLedgerBehavior>>,
    submissions: Arc<AtomicUsize>,
    settle_delay: Duration,
    atomic_batches: bool,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl FakeLedger {
    /// Create new [`FakeLedger`] settling submissions after `settle_delay`
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(Accounts::default())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            behavior: Arc::new(Mutex::new(FakeLedgerBehavior::default())),
            submissions: Arc::new(AtomicUsize::new(0)),
            settle_delay,
            atomic_batches: true,
        }
    }

    /// Apply multi-operation batches one operation at a time
    pub fn without_atomic_batches(mut self) -> Self {
        self.atomic_batches = false;
        self
    }

    /// Replace the failure injection
    pub async fn set_behavior(&self, behavior: FakeLedgerBehavior) {
        *self.behavior.lock().await = behavior;
    }

    /// Replace the failure injection from its JSON form
    pub async fn set_behavior_json(&self, json: &str) -> Result<(), Error> {
        let behavior: FakeLedgerBehavior = serde_json::from_str(json)?;
        self.set_behavior(behavior).await;
        Ok(())
    }

    /// Register an owner account
    pub async fn open_account(&self, owner: Address) {
        self.accounts.write().await.owners.insert(owner);
    }

    /// Credit `owner`'s holding account for `asset`, creating it if needed
    pub async fn fund(&self, owner: Address, asset: &Asset, amount: Amount) -> Result<(), Error> {
        let holding = HoldingAccount::derive(&owner, asset);
        let mut accounts = self.accounts.write().await;
        accounts.owners.insert(owner);

        let balance = accounts.balances.entry(holding).or_insert(Amount::ZERO);
        *balance = balance.checked_add(amount).ok_or(Error::AmountOverflow)?;
        Ok(())
    }

    /// Balance of a holding account
    pub async fn balance_of(&self, account: &HoldingAccount) -> Option<Amount> {
        self.accounts.read().await.balances.get(account).copied()
    }

    /// Number of accepted submissions
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    async fn apply(&self, operations: &[SettlementOperation]) -> Result<(), Error> {
        let short_credit = self.behavior.lock().await.short_credit;
        let mut accounts = self.accounts.write().await;

        if self.atomic_batches {
            let mut staged = accounts.balances.clone();
            for op in operations {
                apply_operation(&mut staged, op, short_credit)?;
            }
            accounts.balances = staged;
        } else {
            for op in operations {
                apply_operation(&mut accounts.balances, op, short_credit)?;
            }
        }

        for op in operations {
            if let SettlementOperation::CreateHoldingAccount { owner, .. } = op {
                accounts.owners.insert(*owner);
            }
        }

        Ok(())
    }
}

fn apply_operation(
    balances: &mut HashMap<HoldingAccount, Amount>,
    op: &SettlementOperation,
    short_credit: Option<Amount>,
) -> Result<(), Error> {
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
            let source_balance = balances
                .get(source)
                .copied()
                .ok_or(Error::AccountNotFound(*source))?;
            let destination_balance = balances
                .get(destination)
                .copied()
                .ok_or(Error::AccountNotFound(*destination))?;

            let debited = source_balance
                .checked_sub(*amount)
                .ok_or(Error::InsufficientFunds(*source))?;
            let credited = destination_balance
                .checked_add(short_credit.unwrap_or(*amount))
                .ok_or(Error::AmountOverflow)?;

            balances.insert(*source, debited);
            balances.insert(*destination, credited);
        }
    }

    Ok(())
}

#[async_trait]
impl LedgerConnector for FakeLedger {
    async fn account_exists(&self, address: &Address) -> Result<bool, LedgerError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.owners.contains(address)
            || accounts
                .balances
                .keys()
                .any(|holding| holding.address() == address))
    }

    async fn get_balance(&self, account: &HoldingAccount) -> Result<Option<Amount>, LedgerError> {
        Ok(self.balance_of(account).await)
    }

    fn supports_atomic_batch(&self) -> bool {
        self.atomic_batches
    }

    #[instrument(skip_all)]
    async fn submit(&self, batch: SignedBatch) -> Result<AttemptId, LedgerError> {
        if let Some(err) = self.behavior.lock().await.submit_err.clone() {
            return Err(LedgerError::Client(err));
        }

        if let Some(op) = batch
            .operations
            .iter()
            .find(|op| op.authority() != &batch.signer)
        {
            return Err(LedgerError::Rejected(format!(
                "{} requires a signature from {}",
                op.kind(),
                op.authority()
            )));
        }

        let count = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        let attempt = AttemptId::new(format!("fake-attempt-{count}"));
        tracing::debug!(
            "Accepted {} operations from {} as {}",
            batch.operations.len(),
            batch.signer,
            attempt
        );

        self.pending
            .lock()
            .await
            .insert(attempt.clone(), batch.operations);
        Ok(attempt)
    }

    #[instrument(skip_all)]
    async fn await_finality(
        &self,
        attempt: &AttemptId,
        timeout: Duration,
    ) -> Result<Finality, LedgerError> {
        let behavior = self.behavior.lock().await.clone();

        if behavior.time_out {
            time::sleep(timeout).await;
            return Ok(Finality::TimedOut);
        }

        if !self.settle_delay.is_zero() {
            time::sleep(self.settle_delay).await;
        }

        let operations = self
            .pending
            .lock()
            .await
            .remove(attempt)
            .ok_or_else(|| Error::UnknownAttempt(attempt.to_string()))?;

        if let Some(reason) = behavior.reject_with {
            return Ok(Finality::Rejected(reason));
        }

        match self.apply(&operations).await {
            Ok(()) => {
                let digest = sha256::Hash::hash(attempt.as_str().as_bytes());
                Ok(Finality::Finalized(TransactionId::new(digest.to_string())))
            }
            Err(err) => {
                tracing::debug!("Rejecting {}: {}", attempt, err);
                Ok(Finality::Rejected(err.to_string()))
            }
        }
    }
}

/// Signer holding a fake key
#[derive(Debug, Clone)]
pub struct FakeSigner {
    identity: Address,
    reject: bool,
}

impl FakeSigner {
    /// Signer whose address is derived from `seed`
    pub fn from_seed(seed: &str) -> Self {
        let digest = sha256::Hash::hash(seed.as_bytes());
        Self {
            identity: Address::from_bytes(digest.to_byte_array()),
            reject: false,
        }
    }

    /// Signer with a random address
    pub fn random() -> Self {
        Self::from_seed(&Uuid::new_v4().to_string())
    }

    /// Decline every signing request
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

#[async_trait]
impl Signer for FakeSigner {
    fn identity(&self) -> Address {
        self.identity
    }

    async fn sign(&self, operations: &[SettlementOperation]) -> Result<SignedBatch, SignerError> {
        if self.reject {
            return Err(SignerError::Rejected);
        }

        let encoded =
            serde_json::to_vec(operations).map_err(|e| SignerError::Signing(e.to_string()))?;
        let mut preimage = self.identity.as_bytes().to_vec();
        preimage.extend_from_slice(&encoded);

        Ok(SignedBatch {
            signer: self.identity,
            operations: operations.to_vec(),
            payload: sha256::Hash::hash(&preimage).to_byte_array().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn asset() -> Asset {
        Asset::new(
            Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap(),
            6,
            "USDC",
        )
    }

    fn transfer(from: &Address, to: &Address, amount: u64) -> SettlementOperation {
        SettlementOperation::Transfer {
            source: HoldingAccount::derive(from, &asset()),
            destination: HoldingAccount::derive(to, &asset()),
            authority: *from,
            amount: Amount::from(amount),
            asset_mint: asset().mint,
            decimals: 6,
        }
    }

    async fn settle(
        ledger: &FakeLedger,
        signer: &FakeSigner,
        ops: &[SettlementOperation],
    ) -> Finality {
        let batch = signer.sign(ops).await.unwrap();
        let attempt = ledger.submit(batch).await.unwrap();
        ledger
            .await_finality(&attempt, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_settles() {
        let ledger = FakeLedger::default();
        let payer = FakeSigner::from_seed("payer");
        let recipient = FakeSigner::from_seed("recipient").identity();
        ledger
            .fund(payer.identity(), &asset(), Amount::from(100))
            .await
            .unwrap();
        ledger.fund(recipient, &asset(), Amount::ZERO).await.unwrap();

        let ops = [transfer(&payer.identity(), &recipient, 40)];
        let finality = settle(&ledger, &payer, &ops).await;

        assert!(matches!(finality, Finality::Finalized(_)));
        assert_eq!(
            ledger
                .balance_of(&HoldingAccount::derive(&payer.identity(), &asset()))
                .await,
            Some(Amount::from(60))
        );
        assert_eq!(
            ledger
                .balance_of(&HoldingAccount::derive(&recipient, &asset()))
                .await,
            Some(Amount::from(40))
        );
        assert_eq!(ledger.submissions(), 1);
    }

    #[tokio::test]
    async fn test_atomic_batch_rolls_back() {
        let ledger = FakeLedger::default();
        let payer = FakeSigner::from_seed("payer");
        let recipient = FakeSigner::from_seed("recipient").identity();
        ledger
            .fund(payer.identity(), &asset(), Amount::from(10))
            .await
            .unwrap();

        let ops = [
            SettlementOperation::CreateHoldingAccount {
                funder: payer.identity(),
                owner: recipient,
                holding_account: HoldingAccount::derive(&recipient, &asset()),
                asset_mint: asset().mint,
            },
            transfer(&payer.identity(), &recipient, 40),
        ];
        let finality = settle(&ledger, &payer, &ops).await;

        match finality {
            Finality::Rejected(reason) => assert!(reason.starts_with("Insufficient funds")),
            other => panic!("unexpected finality {other:?}"),
        }
        assert_eq!(
            ledger
                .balance_of(&HoldingAccount::derive(&recipient, &asset()))
                .await,
            None
        );
    }

    #[tokio::test]
    async fn test_behavior_json() {
        let ledger = FakeLedger::default();
        ledger
            .set_behavior_json(r#"{"submit_err":"blockhash not found"}"#)
            .await
            .unwrap();

        let signer = FakeSigner::random();
        let batch = signer.sign(&[]).await.unwrap();
        assert_eq!(
            ledger.submit(batch).await.unwrap_err(),
            LedgerError::Client("blockhash not found".to_string())
        );
        assert_eq!(ledger.submissions(), 0);

        assert!(ledger.set_behavior_json("not json").await.is_err());
    }

    #[tokio::test]
    async fn test_foreign_authority_refused() {
        let ledger = FakeLedger::default();
        let payer = FakeSigner::from_seed("payer");
        let thief = FakeSigner::from_seed("thief");

        let batch = thief
            .sign(&[transfer(&payer.identity(), &thief.identity(), 1)])
            .await
            .unwrap();

        assert!(matches!(
            ledger.submit(batch).await,
            Err(LedgerError::Rejected(_))
        ));
        assert_eq!(ledger.submissions(), 0);
    }

    #[tokio::test]
    async fn test_rejecting_signer() {
        let signer = FakeSigner::from_seed("payer").rejecting();
        assert_eq!(signer.sign(&[]).await.unwrap_err(), SignerError::Rejected);
    }

    #[test]
    fn test_seeded_identity_is_stable() {
        assert_eq!(
            FakeSigner::from_seed("alice").identity(),
            FakeSigner::from_seed("alice").identity()
        );
        assert_ne!(
            FakeSigner::from_seed("alice").identity(),
            FakeSigner::from_seed("bob").identity()
        );
    }
}
