// Command-line interface
//
//   allowlist node                 run a ledger node
//   allowlist deploy <capacity>    deploy a registry, print its address
//   allowlist join                 join with the configured account
//   allowlist is-member [address]  membership check
//   allowlist count                number of members
//   allowlist status               connection and membership summary

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chain::Address;

pub use commands::run;

/// allowlist - capped on-chain membership registry
#[derive(Parser, Debug)]
#[command(name = "allowlist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.allowlist/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Node URL
    #[arg(long, global = true)]
    pub node_url: Option<String>,

    /// Registry address
    #[arg(long, global = true)]
    pub registry: Option<Address>,

    /// Signing account: a 0x address, or a name for a deterministic dev account
    #[arg(long, global = true, value_parser = parse_account)]
    pub account: Option<Address>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a ledger node serving the registry API
    Node {
        /// Bind address (e.g. 127.0.0.1:8545)
        #[arg(long)]
        bind: Option<String>,

        /// Chain id this node reports
        #[arg(long)]
        chain_id: Option<u64>,

        /// Milliseconds between blocks
        #[arg(long)]
        block_interval_ms: Option<u64>,

        /// Ledger snapshot file
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Deploy a registry with a fixed capacity and print its address
    Deploy {
        /// Maximum number of members
        capacity: u64,

        /// Record the new registry address in the config file
        #[arg(long)]
        save: bool,
    },

    /// Join the registry with the configured account
    Join {
        /// Stop waiting for confirmation after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Check whether an address has joined (default: the configured account)
    IsMember {
        #[arg(value_parser = parse_account)]
        address: Option<Address>,
    },

    /// Print how many addresses have joined
    Count,

    /// Print network, registry and membership status
    Status,
}

/// Accept `0x…` addresses as-is and derive dev accounts from anything else.
pub fn parse_account(value: &str) -> Result<Address, String> {
    Address::parse_account(value).map_err(|e| e.to_string())
}
