// Ledger: in-process stand-in for the chain that hosts registries.
//
// Submissions land in a pending pool and do nothing until a block is
// produced. `produce_block` drains the pool in submission order under a
// single write lock, so every registry sees joins one at a time in a total
// order. Receipts only exist for applied transactions.
//
// State can be snapshotted to a JSON file so a node survives restarts.

pub mod producer;
pub mod transaction;

pub use producer::spawn_block_producer;
pub use transaction::{Call, Query, QueryResult, Receipt, TransactionRequest, TxStatus};

use anyhow::{Context, Result as AnyResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chain::{Address, ChainId, TxHash};
use crate::config::constants::INTENT_RETENTION_BLOCKS;
use crate::errors::{AllowlistError, Result};
use crate::metrics::NodeMetrics;
use crate::registry::{JoinOutcome, Registry};

/// Everything the ledger persists.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    block_number: u64,
    registries: HashMap<Address, Registry>,
    /// Deployments made per account; feeds registry address derivation.
    deploy_nonces: HashMap<Address, u64>,
    receipts: HashMap<TxHash, Receipt>,
    /// Intent ids seen per sender. Two senders may pick the same id.
    intents: HashMap<Address, HashMap<Uuid, IntentEntry>>,
    pending: Vec<PendingEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct IntentEntry {
    tx_hash: TxHash,
    /// Height when the intent was first submitted.
    submitted_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingEntry {
    tx_hash: TxHash,
    request: TransactionRequest,
}

pub struct Ledger {
    chain_id: ChainId,
    state: RwLock<LedgerState>,
    metrics: Option<Arc<NodeMetrics>>,
}

impl Ledger {
    pub fn new(chain_id: ChainId) -> Self {
        Self::with_state(chain_id, LedgerState::default())
    }

    fn with_state(chain_id: ChainId, state: LedgerState) -> Self {
        Self {
            chain_id,
            state: RwLock::new(state),
            metrics: None,
        }
    }

    /// Load a snapshot from `path`, or start empty if the file is absent.
    pub fn load_or_create(chain_id: ChainId, path: &Path) -> AnyResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No ledger snapshot, starting from genesis");
            return Ok(Self::new(chain_id));
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger snapshot from {}", path.display()))?;
        let state: LedgerState =
            serde_json::from_str(&raw).context("Failed to parse ledger snapshot JSON")?;
        info!(
            path = %path.display(),
            block_number = state.block_number,
            registries = state.registries.len(),
            "Loaded ledger snapshot"
        );
        Ok(Self::with_state(chain_id, state))
    }

    /// Write the current state to `path`.
    pub async fn save_snapshot(&self, path: &Path) -> AnyResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state).context("Failed to serialize ledger state")?
        };
        // Write beside the target and rename, so a crash never leaves a
        // truncated snapshot behind.
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, json)
            .with_context(|| format!("Failed to write ledger snapshot to {}", staging.display()))?;
        std::fs::rename(&staging, path)
            .with_context(|| format!("Failed to move ledger snapshot into {}", path.display()))?;
        Ok(())
    }

    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub async fn block_number(&self) -> u64 {
        self.state.read().await.block_number
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Accept a transaction into the pending pool and return its hash.
    ///
    /// Does not apply anything. A sender reusing one of its own intent ids
    /// gets back the hash recorded for that intent.
    pub async fn submit(&self, request: TransactionRequest) -> Result<TxHash> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .intents
            .get(&request.from)
            .and_then(|seen| seen.get(&request.intent_id))
        {
            debug!(
                intent_id = %request.intent_id,
                from = %request.from,
                tx_hash = %existing.tx_hash,
                "Duplicate intent, returning original transaction"
            );
            return Ok(existing.tx_hash);
        }

        if let Call::Join { registry } = request.call {
            if !state.registries.contains_key(&registry) {
                return Err(AllowlistError::UnknownRegistry(registry));
            }
        }

        let tx_hash = request.hash();
        // Identical requests hash alike; once the intent is pruned the
        // receipt still identifies the applied transaction.
        if state.receipts.contains_key(&tx_hash) {
            debug!(%tx_hash, "Transaction already applied");
            return Ok(tx_hash);
        }
        debug!(%tx_hash, from = %request.from, call = ?request.call, "Transaction pending");
        let submitted_at = state.block_number;
        state.intents.entry(request.from).or_default().insert(
            request.intent_id,
            IntentEntry {
                tx_hash,
                submitted_at,
            },
        );
        state.pending.push(PendingEntry { tx_hash, request });

        if let Some(metrics) = &self.metrics {
            metrics.transactions_submitted.inc();
            metrics.pending_transactions.set(state.pending.len() as i64);
        }
        Ok(tx_hash)
    }

    /// Apply every pending transaction in submission order as one block.
    ///
    /// Returns the receipts written. An empty pool produces no block.
    pub async fn produce_block(&self) -> Vec<Receipt> {
        let mut state = self.state.write().await;
        if state.pending.is_empty() {
            return Vec::new();
        }

        state.block_number += 1;
        let block_number = state.block_number;
        let pending = std::mem::take(&mut state.pending);
        let mut receipts = Vec::with_capacity(pending.len());

        for entry in pending {
            let receipt = state.apply(entry, block_number);
            if let Some(metrics) = &self.metrics {
                metrics.transactions_applied.inc();
                if !receipt.is_success() {
                    metrics.transactions_reverted.inc();
                }
            }
            state.receipts.insert(receipt.tx_hash, receipt.clone());
            receipts.push(receipt);
        }

        state.prune_intents(block_number);

        if let Some(metrics) = &self.metrics {
            metrics.blocks_produced.inc();
            metrics.pending_transactions.set(0);
        }
        info!(block_number, transactions = receipts.len(), "Produced block");
        receipts
    }

    pub async fn receipt(&self, tx_hash: &TxHash) -> Option<Receipt> {
        self.state.read().await.receipts.get(tx_hash).cloned()
    }

    /// Answer a read against confirmed state.
    pub async fn call(&self, registry: Address, query: Query) -> Result<QueryResult> {
        let state = self.state.read().await;
        let target = state
            .registries
            .get(&registry)
            .ok_or(AllowlistError::UnknownRegistry(registry))?;
        Ok(match query {
            Query::IsMember { address } => QueryResult::IsMember(target.is_member(&address)),
            Query::Count => QueryResult::Count(target.count()),
            Query::Capacity => QueryResult::Capacity(target.capacity()),
        })
    }
}

impl LedgerState {
    /// Forget intents older than `INTENT_RETENTION_BLOCKS`. Anything that
    /// old has long been applied, so a resubmission is a new transaction.
    fn prune_intents(&mut self, block_number: u64) {
        let Some(cutoff) = block_number.checked_sub(INTENT_RETENTION_BLOCKS) else {
            return;
        };
        self.intents.retain(|_, seen| {
            seen.retain(|_, entry| entry.submitted_at > cutoff);
            !seen.is_empty()
        });
    }

    fn apply(&mut self, entry: PendingEntry, block_number: u64) -> Receipt {
        let PendingEntry { tx_hash, request } = entry;
        let mut contract_address = None;

        let status = match request.call {
            Call::Deploy { capacity } => {
                let nonce = self.deploy_nonces.entry(request.from).or_insert(0);
                let address = registry_address(&request.from, *nonce);
                *nonce += 1;
                self.registries.insert(address, Registry::new(capacity));
                contract_address = Some(address);
                info!(%address, capacity, deployer = %request.from, "Registry deployed");
                TxStatus::Success
            }
            Call::Join { registry } => match self.registries.get_mut(&registry) {
                Some(target) => match target.join(request.from) {
                    JoinOutcome::Accepted => {
                        debug!(%registry, participant = %request.from, count = target.count(), "Participant admitted");
                        TxStatus::Success
                    }
                    JoinOutcome::Rejected(rejection) => TxStatus::Reverted {
                        reason: rejection.reason().to_string(),
                    },
                },
                None => TxStatus::Reverted {
                    reason: format!("no registry at {registry}"),
                },
            },
        };

        Receipt {
            tx_hash,
            from: request.from,
            block_number,
            status,
            contract_address,
            confirmed_at: Utc::now(),
        }
    }
}

/// Registry address for the `nonce`-th deployment by `deployer`.
pub fn registry_address(deployer: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"allowlist.registry");
    hasher.update(deployer.as_bytes());
    hasher.update(nonce.to_be_bytes());
    Address::from_digest_tail(&hasher.finalize())
}
