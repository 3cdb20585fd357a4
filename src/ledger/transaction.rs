// Transaction, query and receipt types shared by the ledger, providers and
// the node API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::chain::{Address, TxHash};

/// State-changing operation carried by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Call {
    /// Create a registry with a fixed capacity.
    Deploy { capacity: u64 },
    /// Add the sender to `registry`.
    Join { registry: Address },
}

/// A signed write as submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub call: Call,
    /// Caller-chosen attempt identifier. Resubmitting the same intent returns
    /// the original transaction instead of creating a second one.
    pub intent_id: Uuid,
}

impl TransactionRequest {
    pub fn new(from: Address, call: Call) -> Self {
        Self {
            from,
            call,
            intent_id: Uuid::new_v4(),
        }
    }

    pub fn with_intent(mut self, intent_id: Uuid) -> Self {
        self.intent_id = intent_id;
        self
    }

    /// Content hash over sender, call and intent id.
    pub fn hash(&self) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(self.from.as_bytes());
        match self.call {
            Call::Deploy { capacity } => {
                hasher.update([0u8]);
                hasher.update(capacity.to_be_bytes());
            }
            Call::Join { registry } => {
                hasher.update([1u8]);
                hasher.update(registry.as_bytes());
            }
        }
        hasher.update(self.intent_id.as_bytes());
        TxHash::from_bytes(hasher.finalize().into())
    }
}

/// Read-only registry query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    IsMember { address: Address },
    Count,
    Capacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryResult {
    IsMember(bool),
    Count(u64),
    Capacity(u64),
}

/// Final status of an applied transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Reverted { reason: String },
}

/// Proof that a transaction was included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub from: Address,
    pub block_number: u64,
    #[serde(flatten)]
    pub status: TxStatus,
    /// Set for successful deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    pub confirmed_at: DateTime<Utc>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TxStatus::Success)
    }

    pub fn revert_reason(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Reverted { reason } => Some(reason),
            TxStatus::Success => None,
        }
    }
}
