// Configuration loader
// Reads ~/.allowlist/config.toml, then applies environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;
use crate::chain::Address;

/// Environment variables consulted after the config file.
pub const ENV_NODE_URL: &str = "ALLOWLIST_NODE_URL";
pub const ENV_REGISTRY: &str = "ALLOWLIST_REGISTRY";
pub const ENV_ACCOUNT: &str = "ALLOWLIST_ACCOUNT";

/// Default config file location.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".allowlist").join("config.toml"))
}

/// Load configuration from the default location or environment.
///
/// A missing config file is not an error: defaults apply.
pub fn load_config() -> Result<Config> {
    let path = default_config_path()?;
    load_config_from(&path)
}

/// Load configuration from `path` (defaults when absent), apply environment
/// overrides and validate.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str::<Config>(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

/// Apply `ALLOWLIST_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_NODE_URL).filter(|v| !v.is_empty()) {
        config.node_url = url;
    }
    if let Some(registry) = lookup(ENV_REGISTRY).filter(|v| !v.is_empty()) {
        config.registry = Some(
            registry
                .parse()
                .with_context(|| format!("{ENV_REGISTRY} is not a valid address"))?,
        );
    }
    if let Some(account) = lookup(ENV_ACCOUNT).filter(|v| !v.is_empty()) {
        config.account = Some(
            Address::parse_account(&account)
                .with_context(|| format!("{ENV_ACCOUNT} is not a valid account"))?,
        );
    }
    Ok(())
}

/// Set `registry` in the config file at `path`, leaving everything else in
/// the file as written. Environment and CLI overrides are not persisted.
pub fn save_registry(path: &Path, registry: Address) -> Result<()> {
    let mut config = if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str::<Config>(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?
    } else {
        Config::default()
    };
    config.registry = Some(registry);
    save_config(&config, path)
}

/// Write `config` to `path` as TOML.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.network.chain_id, crate::config::constants::DEFAULT_CHAIN_ID);
        assert_eq!(loaded.node.bind_address, crate::config::constants::DEFAULT_NODE_ADDR);
    }

    #[test]
    fn test_parses_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let registry = Address::from_seed("registry");
        fs::write(
            &path,
            format!(
                r#"
node_url = "http://10.0.0.5:8545"
registry = "{registry}"

[network]
chain_id = 31337
name = "Localnet"

[confirmation]
poll_interval_ms = 250
timeout_secs = 60

[node]
bind_address = "0.0.0.0:8545"
chain_id = 31337
block_interval_ms = 500
rate_limit_per_sec = 1.0
rate_limit_burst = 2.0
"#
            ),
        )
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let config: Config = toml::from_str(&contents).unwrap();
        assert_eq!(config.node_url, "http://10.0.0.5:8545");
        assert_eq!(config.registry, Some(registry));
        assert_eq!(config.network.chain_id, 31337);
        assert_eq!(config.confirmation.timeout_secs, Some(60));
        assert_eq!(config.node.block_interval_ms, 500);
        assert!(config.account.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("node_url = \"http://node:1\"\n").unwrap();
        assert_eq!(config.network.chain_id, 80001);
        assert_eq!(config.confirmation.poll_interval_ms, 500);
    }

    #[test]
    fn test_bad_registry_in_file_fails() {
        let result: std::result::Result<Config, _> = toml::from_str("registry = \"0x12\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let account = Address::from_seed("alice");
        let vars: HashMap<&str, String> = HashMap::from([
            (ENV_NODE_URL, "http://other:9000".to_string()),
            (ENV_ACCOUNT, account.to_string()),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.node_url, "http://other:9000");
        assert_eq!(config.account, Some(account));
        assert!(config.registry.is_none());
    }

    #[test]
    fn test_env_account_accepts_seed_name() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| (k == ENV_ACCOUNT).then(|| "alice".to_string())).unwrap();
        assert_eq!(config.account, Some(Address::from_seed("alice")));
        assert_eq!(
            config.account.map(|a| a.to_string()),
            crate::cli::parse_account("alice").ok().map(|a| a.to_string())
        );
    }

    #[test]
    fn test_env_invalid_address_fails() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == ENV_REGISTRY).then(|| "nope".to_string())
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_save_registry_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "node_url = \"http://node:7\"\n").unwrap();

        let registry = Address::from_seed("registry");
        save_registry(&path, registry).unwrap();

        let back: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.registry, Some(registry));
        assert_eq!(back.node_url, "http://node:7");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            account: Some(Address::from_seed("bob")),
            ..Config::default()
        };
        save_config(&config, &path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let back: Config = toml::from_str(&contents).unwrap();
        assert_eq!(back.account, config.account);
    }
}
