// In-process provider backed directly by a `Ledger`.

use async_trait::async_trait;
use std::sync::Arc;

use super::Provider;
use crate::chain::{Address, ChainId, TxHash};
use crate::errors::Result;
use crate::ledger::{Ledger, Query, QueryResult, Receipt, TransactionRequest};

pub struct LocalProvider {
    ledger: Arc<Ledger>,
    /// Chain id to report instead of the ledger's own. Models a wallet that
    /// has been switched to a different network.
    reported_chain: Option<ChainId>,
}

impl LocalProvider {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            reported_chain: None,
        }
    }

    /// Report `chain_id` from `chain_id()` regardless of the ledger's.
    pub fn on_chain(mut self, chain_id: ChainId) -> Self {
        self.reported_chain = Some(chain_id);
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }
}

#[async_trait]
impl Provider for LocalProvider {
    async fn chain_id(&self) -> Result<ChainId> {
        Ok(self.reported_chain.unwrap_or_else(|| self.ledger.chain_id()))
    }

    async fn call(&self, registry: Address, query: Query) -> Result<QueryResult> {
        self.ledger.call(registry, query).await
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash> {
        self.ledger.submit(request.clone()).await
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>> {
        Ok(self.ledger.receipt(tx_hash).await)
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_ledger_chain_by_default() {
        let provider = LocalProvider::new(Arc::new(Ledger::new(ChainId(80001))));
        assert_eq!(provider.chain_id().await.unwrap(), ChainId(80001));
    }

    #[tokio::test]
    async fn test_on_chain_overrides_reported_chain() {
        let provider = LocalProvider::new(Arc::new(Ledger::new(ChainId(80001)))).on_chain(ChainId(1));
        assert_eq!(provider.chain_id().await.unwrap(), ChainId(1));
        assert_eq!(provider.ledger().chain_id(), ChainId(80001));
    }
}
