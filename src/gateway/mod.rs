// Transaction gateway: writes as submit / await-confirmation / result.
//
// Submission returns as soon as the ledger has the transaction pending.
// Only a receipt says what happened. The gateway never resubmits on its own:
// a second join after an ambiguous failure would come back as a duplicate
// and look like success, so retry decisions stay with the caller, who can
// reuse the same intent id to make resubmission safe.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chain::{Address, TxHash};
use crate::errors::{AllowlistError, Result};
use crate::ledger::{Call, Receipt, TransactionRequest};
use crate::providers::{Provider, Signer};
use crate::registry::{JoinOutcome, Rejection};

/// Handle to a submitted transaction.
pub struct PendingTransaction {
    tx_hash: TxHash,
    provider: Arc<dyn Provider>,
    poll_interval: Duration,
}

impl PendingTransaction {
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Check once for a receipt.
    pub async fn poll(&self) -> Result<Option<Receipt>> {
        self.provider.receipt(&self.tx_hash).await
    }

    /// Suspend until the ledger reports the transaction applied.
    ///
    /// Has no deadline of its own; wrap in `tokio::time::timeout` for one.
    pub async fn wait(&self) -> Result<Receipt> {
        loop {
            if let Some(receipt) = self.poll().await? {
                debug!(
                    tx_hash = %self.tx_hash,
                    block_number = receipt.block_number,
                    success = receipt.is_success(),
                    "Transaction confirmed"
                );
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Receipt of a join together with its admission outcome.
#[derive(Debug, Clone)]
pub struct JoinReceipt {
    pub outcome: JoinOutcome,
    pub receipt: Receipt,
}

pub struct TransactionGateway {
    poll_interval: Duration,
}

impl TransactionGateway {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Submit `call` from the signer's account under `intent_id`.
    pub async fn submit(&self, signer: &Signer, call: Call, intent_id: Uuid) -> Result<PendingTransaction> {
        let request = TransactionRequest::new(signer.account(), call).with_intent(intent_id);
        let tx_hash = signer.provider().send_transaction(&request).await?;
        info!(%tx_hash, from = %signer.account(), ?call, "Transaction submitted");
        Ok(self.resume(Arc::clone(signer.provider()), tx_hash))
    }

    /// Re-attach to a transaction submitted earlier.
    pub fn resume(&self, provider: Arc<dyn Provider>, tx_hash: TxHash) -> PendingTransaction {
        PendingTransaction {
            tx_hash,
            provider,
            poll_interval: self.poll_interval,
        }
    }

    /// Join `registry` with the signer's account and wait for the outcome.
    pub async fn join(&self, signer: &Signer, registry: Address) -> Result<JoinReceipt> {
        let pending = self
            .submit(signer, Call::Join { registry }, Uuid::new_v4())
            .await?;
        let receipt = pending.wait().await?;
        let outcome = interpret_join(&receipt)?;
        Ok(JoinReceipt { outcome, receipt })
    }

    /// Deploy a registry with `capacity` and wait for its address.
    pub async fn deploy(&self, signer: &Signer, capacity: u64) -> Result<Address> {
        let pending = self
            .submit(signer, Call::Deploy { capacity }, Uuid::new_v4())
            .await?;
        let receipt = pending.wait().await?;
        match (receipt.contract_address, receipt.revert_reason()) {
            (Some(address), None) => Ok(address),
            (_, reason) => Err(AllowlistError::TransactionReverted {
                tx_hash: receipt.tx_hash,
                reason: reason.unwrap_or("deployment produced no address").to_string(),
            }),
        }
    }
}

/// Read the admission outcome out of a join receipt.
///
/// Reverts that are not admission rejections come back verbatim as
/// `TransactionReverted`.
pub fn interpret_join(receipt: &Receipt) -> Result<JoinOutcome> {
    match receipt.revert_reason() {
        None => Ok(JoinOutcome::Accepted),
        Some(reason) => match Rejection::from_reason(reason) {
            Some(rejection) => Ok(JoinOutcome::Rejected(rejection)),
            None => {
                warn!(tx_hash = %receipt.tx_hash, reason, "Join reverted");
                Err(AllowlistError::TransactionReverted {
                    tx_hash: receipt.tx_hash,
                    reason: reason.to_string(),
                })
            }
        },
    }
}
