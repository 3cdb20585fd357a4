// Ledger providers
//
// A provider is the session's window onto the chain: it reports which
// network it is connected to, answers registry reads, accepts signed writes
// and hands back receipts once they exist. The chain id is asked for on
// every call rather than cached because the user can repoint their
// connection at any time.

use async_trait::async_trait;
use std::sync::Arc;

use crate::chain::{Address, ChainId, TxHash};
use crate::errors::Result;
use crate::ledger::{Query, QueryResult, Receipt, TransactionRequest};

pub mod http;
pub mod local;

pub use http::HttpProvider;
pub use local::LocalProvider;

/// Read/write access to a ledger.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Chain the connection currently targets.
    async fn chain_id(&self) -> Result<ChainId>;

    /// Answer a read against the latest confirmed state.
    async fn call(&self, registry: Address, query: Query) -> Result<QueryResult>;

    /// Hand a transaction to the ledger. Returns once it is pending.
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash>;

    /// Receipt for `tx_hash`, or `None` while it is still pending.
    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>>;

    /// Provider name for logs (e.g. "local", "http")
    fn name(&self) -> &str;
}

/// A provider paired with the account that authorizes writes.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn Provider>,
    account: Address,
}

impl Signer {
    pub fn new(provider: Arc<dyn Provider>, account: Address) -> Self {
        Self { provider, account }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("provider", &self.provider.name())
            .field("account", &self.account)
            .finish()
    }
}
