// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::constants::*;
use crate::chain::{Address, ChainId};
use crate::errors::{AllowlistError, Result};
use crate::guard::Network;

/// Full configuration, as read from `~/.allowlist/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node the client talks to
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Registry address returned by `allowlist deploy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<Address>,

    /// Account that signs writes (omit for read-only use)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Address>,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub node: NodeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            registry: None,
            account: None,
            network: NetworkConfig::default(),
            confirmation: ConfirmationConfig::default(),
            node: NodeConfig::default(),
        }
    }
}

fn default_node_url() -> String {
    DEFAULT_NODE_URL.to_string()
}

/// Expected network for the network guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            name: DEFAULT_NETWORK_NAME.to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn to_network(&self) -> Network {
        Network::new(ChainId(self.chain_id), self.name.clone())
    }
}

/// How the client waits for transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub poll_interval_ms: u64,
    /// Give up waiting after this many seconds (no limit when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_secs: None,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Settings for `allowlist node`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub bind_address: String,
    pub chain_id: u64,
    pub block_interval_ms: u64,
    /// Ledger snapshot file (in-memory only when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
    pub rate_limit_per_sec: f64,
    pub rate_limit_burst: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_NODE_ADDR.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            block_interval_ms: DEFAULT_BLOCK_INTERVAL_MS,
            state_path: None,
            rate_limit_per_sec: DEFAULT_RATE_LIMIT_PER_SEC,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

impl NodeConfig {
    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> Result<()> {
        if self.node_url.trim().is_empty() {
            return Err(AllowlistError::Config("node_url must not be empty".into()));
        }
        if !self.node_url.starts_with("http://") && !self.node_url.starts_with("https://") {
            return Err(AllowlistError::Config(format!(
                "node_url must be an http(s) URL, got '{}'",
                self.node_url
            )));
        }
        if self.confirmation.poll_interval_ms == 0 {
            return Err(AllowlistError::Config(
                "confirmation.poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.confirmation.timeout_secs == Some(0) {
            return Err(AllowlistError::Config(
                "confirmation.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.node.block_interval_ms == 0 {
            return Err(AllowlistError::Config(
                "node.block_interval_ms must be greater than 0".into(),
            ));
        }
        let per_sec = self.node.rate_limit_per_sec;
        let burst = self.node.rate_limit_burst;
        if !(per_sec.is_finite() && per_sec > 0.0 && burst.is_finite() && burst >= 1.0) {
            return Err(AllowlistError::Config(
                "node rate limit must allow at least one request".into(),
            ));
        }
        Ok(())
    }

    /// The registry address, or an error telling the user how to get one.
    pub fn require_registry(&self) -> Result<Address> {
        self.registry.ok_or_else(|| {
            AllowlistError::Config(
                "No registry configured. Deploy one with `allowlist deploy <capacity>` \
                 and set `registry` in ~/.allowlist/config.toml or pass --registry"
                    .into(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.to_network(), Network::default());
        assert_eq!(config.confirmation.timeout(), None);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = Config::default();
        config.confirmation.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_rate_limit_rejected() {
        for (per_sec, burst) in [(f64::NAN, 20.0), (5.0, f64::NAN), (f64::INFINITY, 20.0), (0.0, 20.0)] {
            let mut config = Config::default();
            config.node.rate_limit_per_sec = per_sec;
            config.node.rate_limit_burst = burst;
            assert!(config.validate().is_err(), "per_sec={per_sec} burst={burst}");
        }
    }

    #[test]
    fn test_non_http_url_rejected() {
        let config = Config {
            node_url: "ftp://example".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AllowlistError::Config(_))));
    }

    #[test]
    fn test_require_registry() {
        let mut config = Config::default();
        assert!(config.require_registry().is_err());
        let addr = Address::from_seed("registry");
        config.registry = Some(addr);
        assert_eq!(config.require_registry().unwrap(), addr);
    }
}
