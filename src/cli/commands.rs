// Command implementations

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;

use super::{Cli, Commands};
use crate::chain::Address;
use crate::config::{self, constants::DEFAULT_HTTP_TIMEOUT_SECS, Config};
use crate::deploy::deploy_registry;
use crate::gateway::TransactionGateway;
use crate::guard::NetworkGuard;
use crate::registry::{JoinOutcome, Rejection};
use crate::server::NodeServer;
use crate::session::{HttpConnector, SessionClient};

/// Run the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate().context("Invalid options")?;

    match cli.command {
        Commands::Node {
            bind,
            chain_id,
            block_interval_ms,
            state,
        } => {
            let mut node = config.node.clone();
            if let Some(bind) = bind {
                node.bind_address = bind;
            }
            if let Some(chain_id) = chain_id {
                node.chain_id = chain_id;
            }
            if let Some(interval) = block_interval_ms {
                node.block_interval_ms = interval;
            }
            if state.is_some() {
                node.state_path = state;
            }
            if node.block_interval_ms == 0 {
                bail!("--block-interval-ms must be greater than 0");
            }
            NodeServer::new(node)?.serve().await
        }
        Commands::Deploy { capacity, save } => {
            let connector = connector(&config);
            let address = deploy_registry(&connector, &guard(&config), &gateway(&config), capacity)
                .await
                .context("Deployment failed")?;
            println!("Allowlist Contract Address: {address}");
            if save {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => config::default_config_path()?,
                };
                config::save_registry(&path, address)?;
                println!("Saved registry to {}", path.display());
            }
            Ok(())
        }
        Commands::Join { timeout_secs } => {
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .or_else(|| config.confirmation.timeout());
            let mut session = connect(&config).await?;
            let report = match timeout {
                Some(limit) => session.join_with_timeout(limit).await?,
                None => session.join().await?,
            };
            let (count, capacity) = session
                .view()
                .map(|v| (v.count, v.capacity))
                .unwrap_or_default();
            match (report.outcome, report.prior_attempt) {
                (JoinOutcome::Accepted, _) => {
                    println!("Joined the allowlist in {} ({count}/{capacity} joined)", report.tx_hash)
                }
                (JoinOutcome::Rejected(Rejection::DuplicateParticipant), Some(prior)) => {
                    println!("Already on the allowlist (joined in {prior})")
                }
                (JoinOutcome::Rejected(Rejection::DuplicateParticipant), None) => {
                    println!("Already on the allowlist")
                }
                (JoinOutcome::Rejected(Rejection::CapacityExceeded), _) => {
                    bail!("The allowlist is full ({count}/{capacity}); could not join")
                }
            }
            Ok(())
        }
        Commands::IsMember { address } => {
            let address = match address.or(config.account) {
                Some(address) => address,
                None => bail!("No address given and no --account configured"),
            };
            let session = connect(&config).await?;
            let member = session.is_member(address).await?;
            println!("{address}: {}", if member { "member" } else { "not a member" });
            Ok(())
        }
        Commands::Count => {
            let session = connect(&config).await?;
            let count = session.count().await?;
            let capacity = session.capacity().await?;
            println!("{count} have already joined the allowlist ({capacity} max)");
            Ok(())
        }
        Commands::Status => {
            let mut session = connect(&config).await?;
            let view = session.refresh().await?.clone();
            let network = config.network.to_network();
            println!("Network:  {} (chain {})", network.name, network.chain_id);
            println!("Node:     {}", config.node_url);
            println!("Registry: {}", session.registry());
            match view.account {
                Some(account) => println!(
                    "Account:  {account} ({})",
                    if view.is_member { "joined" } else { "not joined" }
                ),
                None => println!("Account:  none (read-only)"),
            }
            println!(
                "Members:  {}/{} ({} slots left)",
                view.count,
                view.capacity,
                view.remaining()
            );
            Ok(())
        }
    }
}

/// Command-line flags win over file and environment.
pub fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.node_url {
        config.node_url = url.clone();
    }
    if let Some(registry) = cli.registry {
        config.registry = Some(registry);
    }
    if let Some(account) = cli.account {
        config.account = Some(account);
    }
}

fn connector(config: &Config) -> HttpConnector {
    HttpConnector::new(
        config.node_url.clone(),
        config.account,
        Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
    )
}

fn guard(config: &Config) -> NetworkGuard {
    NetworkGuard::new(config.network.to_network())
}

fn gateway(config: &Config) -> TransactionGateway {
    TransactionGateway::new(config.confirmation.poll_interval())
}

async fn connect(config: &Config) -> Result<SessionClient> {
    let registry: Address = config.require_registry()?;
    let mut session = SessionClient::new(
        Arc::new(connector(config)),
        guard(config),
        gateway(config),
        registry,
    );
    session.connect().await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_win() {
        let account = Address::from_seed("alice");
        let registry = Address::from_seed("registry");
        let registry_arg = registry.to_string();
        let cli = Cli::try_parse_from([
            "allowlist",
            "--node-url",
            "http://node:1",
            "--registry",
            registry_arg.as_str(),
            "--account",
            "alice",
            "count",
        ])
        .unwrap();

        let mut config = Config::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.node_url, "http://node:1");
        assert_eq!(config.registry, Some(registry));
        assert_eq!(config.account, Some(account));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::try_parse_from(["allowlist", "status"]).unwrap();
        let mut config = Config::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.node_url, crate::config::constants::DEFAULT_NODE_URL);
        assert!(config.registry.is_none());
    }
}
