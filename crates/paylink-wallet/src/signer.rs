//! Signer

use std::fmt::Debug;

use async_trait::async_trait;
use paylink::Address;

use crate::connector::SignedBatch;
use crate::error::SignerError;
use crate::operation::SettlementOperation;

/// Payer key holder.
///
/// Keys never leave the signer. A user declining to sign is reported as
/// [`SignerError::Rejected`].
#[async_trait]
pub trait Signer: Debug + Send + Sync {
    /// Address of the payer
    fn identity(&self) -> Address;

    /// Authorize `operations` as one batch
    async fn sign(&self, operations: &[SettlementOperation]) -> Result<SignedBatch, SignerError>;
}
