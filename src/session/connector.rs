// Connectors: how a session acquires its connection context.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::Address;
use crate::errors::{AllowlistError, Result};
use crate::providers::{HttpProvider, Provider, Signer};

/// A provider plus, optionally, the account allowed to sign writes.
#[derive(Clone)]
pub struct ConnectionContext {
    provider: Arc<dyn Provider>,
    account: Option<Address>,
}

impl ConnectionContext {
    pub fn new(provider: Arc<dyn Provider>, account: Option<Address>) -> Self {
        Self { provider, account }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    /// Write authority for this connection.
    pub fn signer(&self) -> Result<Signer> {
        let account = self.account.ok_or(AllowlistError::NoSigner)?;
        Ok(Signer::new(Arc::clone(&self.provider), account))
    }
}

impl std::fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("provider", &self.provider.name())
            .field("account", &self.account)
            .finish()
    }
}

/// Source of connection contexts.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<ConnectionContext>;
}

/// Connects to an `allowlist node` over HTTP.
pub struct HttpConnector {
    node_url: String,
    account: Option<Address>,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(node_url: impl Into<String>, account: Option<Address>, timeout: Duration) -> Self {
        Self {
            node_url: node_url.into(),
            account,
            timeout,
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> Result<ConnectionContext> {
        let provider = HttpProvider::new(self.node_url.clone(), self.timeout)?;
        // Reachability check: acquisition fails here rather than on first use.
        provider.chain_info().await?;
        Ok(ConnectionContext::new(Arc::new(provider), self.account))
    }
}

/// Hands out a fixed provider. Used for in-process ledgers.
pub struct StaticConnector {
    provider: Arc<dyn Provider>,
    account: Option<Address>,
}

impl StaticConnector {
    pub fn new(provider: Arc<dyn Provider>, account: Option<Address>) -> Self {
        Self { provider, account }
    }
}

#[async_trait]
impl Connector for StaticConnector {
    async fn connect(&self) -> Result<ConnectionContext> {
        Ok(ConnectionContext::new(Arc::clone(&self.provider), self.account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;
    use crate::ledger::Ledger;
    use crate::providers::LocalProvider;

    #[test]
    fn test_read_only_context_has_no_signer() {
        let provider: Arc<dyn Provider> =
            Arc::new(LocalProvider::new(Arc::new(Ledger::new(ChainId(80001)))));
        let ctx = ConnectionContext::new(provider, None);
        assert_eq!(ctx.signer().unwrap_err(), AllowlistError::NoSigner);
    }

    #[tokio::test]
    async fn test_static_connector_carries_account() {
        let provider: Arc<dyn Provider> =
            Arc::new(LocalProvider::new(Arc::new(Ledger::new(ChainId(80001)))));
        let account = Address::from_seed("alice");
        let ctx = StaticConnector::new(provider, Some(account))
            .connect()
            .await
            .unwrap();
        assert_eq!(ctx.signer().unwrap().account(), account);
    }

    #[tokio::test]
    async fn test_http_connector_fails_when_node_down() {
        let connector = HttpConnector::new("http://127.0.0.1:9", None, Duration::from_secs(2));
        assert!(matches!(
            connector.connect().await,
            Err(AllowlistError::TransportFailure(_))
        ));
    }
}
