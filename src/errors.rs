// Error taxonomy shared by the registry client, gateway and node API.
//
// Admission rejections (duplicate, full) are not errors: they come back as
// `registry::JoinOutcome` values. Everything here fails one operation attempt
// and nothing is fatal to the process.

use thiserror::Error;

use crate::chain::{Address, ChainId, TxHash};

pub type Result<T> = std::result::Result<T, AllowlistError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowlistError {
    /// The connection points at another chain. The user has to switch.
    #[error(
        "Wrong network: connected to chain {actual}, expected {expected_name} (chain {expected}). \
         Change the network to {expected_name}"
    )]
    WrongNetwork {
        expected: ChainId,
        expected_name: String,
        actual: ChainId,
    },

    /// Provider acquisition, submission or receipt polling failed.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The ledger applied the transaction and reverted it.
    #[error("Transaction {tx_hash} reverted: {reason}")]
    TransactionReverted { tx_hash: TxHash, reason: String },

    /// A caller-imposed deadline elapsed before the receipt appeared.
    /// The transaction may still confirm later.
    #[error("Timed out waiting for transaction {tx_hash} to confirm")]
    ConfirmationTimeout { tx_hash: TxHash },

    #[error("Session is not connected")]
    NotConnected,

    #[error("Connection has no signing account; joining requires one")]
    NoSigner,

    #[error("No registry deployed at {0}")]
    UnknownRegistry(Address),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid transaction hash '{0}'")]
    InvalidTxHash(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AllowlistError {
    /// Whether repeating the whole operation (from connection acquisition)
    /// can succeed without the user doing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AllowlistError::TransportFailure(_) | AllowlistError::ConfirmationTimeout { .. }
        )
    }
}

impl From<reqwest::Error> for AllowlistError {
    fn from(err: reqwest::Error) -> Self {
        AllowlistError::TransportFailure(err.to_string())
    }
}
