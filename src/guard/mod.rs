// Network guard: refuse to touch a registry on the wrong chain.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::ChainId;
use crate::config::constants::{DEFAULT_CHAIN_ID, DEFAULT_NETWORK_NAME};
use crate::errors::{AllowlistError, Result};
use crate::providers::Provider;

/// The one network a session may operate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: String,
}

impl Network {
    pub fn new(chain_id: ChainId, name: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new(ChainId(DEFAULT_CHAIN_ID), DEFAULT_NETWORK_NAME)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkGuard {
    expected: Network,
}

impl NetworkGuard {
    pub fn new(expected: Network) -> Self {
        Self { expected }
    }

    /// Compare an already-known chain id with the expected one.
    pub fn verify(&self, actual: ChainId) -> Result<()> {
        if actual == self.expected.chain_id {
            return Ok(());
        }
        warn!(
            expected = %self.expected.chain_id,
            actual = %actual,
            "Connection is on the wrong network"
        );
        Err(AllowlistError::WrongNetwork {
            expected: self.expected.chain_id,
            expected_name: self.expected.name.clone(),
            actual,
        })
    }

    /// Ask the provider which chain it is on right now and verify it.
    pub async fn check(&self, provider: &dyn Provider) -> Result<ChainId> {
        let actual = provider.chain_id().await?;
        self.verify(actual)?;
        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::providers::LocalProvider;
    use std::sync::Arc;

    #[test]
    fn test_default_network_is_mumbai() {
        let network = Network::default();
        assert_eq!(network.chain_id, ChainId(80001));
        assert_eq!(network.name, "Mumbai");
    }

    #[test]
    fn test_verify_mismatch() {
        let guard = NetworkGuard::new(Network::default());
        assert!(guard.verify(ChainId(80001)).is_ok());
        match guard.verify(ChainId(137)).unwrap_err() {
            AllowlistError::WrongNetwork {
                expected, actual, ..
            } => {
                assert_eq!(expected, ChainId(80001));
                assert_eq!(actual, ChainId(137));
            }
            other => panic!("Expected WrongNetwork, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_asks_provider() {
        let ledger = Arc::new(Ledger::new(ChainId(80001)));
        let guard = NetworkGuard::new(Network::default());

        let good = LocalProvider::new(Arc::clone(&ledger));
        assert_eq!(guard.check(&good).await.unwrap(), ChainId(80001));

        let switched = LocalProvider::new(ledger).on_chain(ChainId(5));
        assert!(matches!(
            guard.check(&switched).await,
            Err(AllowlistError::WrongNetwork { .. })
        ));
    }
}
