// Allowlist - capped on-chain membership registry
// Library exports

// Core protocol
pub mod chain;
pub mod errors;
pub mod registry;

// Ledger and access to it
pub mod gateway;
pub mod guard;
pub mod ledger;
pub mod providers;
pub mod session;

// Node, bootstrap and CLI
pub mod cli;
pub mod config;
pub mod deploy;
pub mod logging;
pub mod metrics;
pub mod server;

pub use chain::{Address, ChainId, TxHash};
pub use errors::{AllowlistError, Result};
pub use registry::{JoinOutcome, Registry, Rejection};
pub use session::{JoinReport, MembershipView, SessionClient, SessionState};
