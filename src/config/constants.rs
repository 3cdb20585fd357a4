// Project-wide constants
//
// Centralised here so ports, chain ids and intervals have one source of
// truth. Import via `use crate::config::constants::*;`.

/// Chain id the client expects by default (Polygon Mumbai testnet).
pub const DEFAULT_CHAIN_ID: u64 = 80001;

/// Human name shown in wrong-network messages.
pub const DEFAULT_NETWORK_NAME: &str = "Mumbai";

/// Default bind address for `allowlist node` (localhost only).
pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:8545";

/// Default node URL the client connects to.
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8545";

/// How often a pending transaction is polled for its receipt.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// How often the node produces a block.
pub const DEFAULT_BLOCK_INTERVAL_MS: u64 = 2000;

/// HTTP request timeout for the node client.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Sustained transaction submissions per second per sender.
pub const DEFAULT_RATE_LIMIT_PER_SEC: f64 = 5.0;

/// Burst of transaction submissions per sender.
pub const DEFAULT_RATE_LIMIT_BURST: f64 = 20.0;

/// Senders idle this long are dropped from the rate limiter.
pub const RATE_LIMIT_IDLE_SECS: u64 = 600;

/// Blocks for which the ledger remembers a submission's intent id.
pub const INTENT_RETENTION_BLOCKS: u64 = 1_000;
