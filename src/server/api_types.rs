// Node API request/response bodies (public for client access)

use serde::{Deserialize, Serialize};

use crate::chain::{Address, ChainId, TxHash};

/// Response from GET /v1/chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: ChainId,
    pub block_number: u64,
}

/// Response from POST /v1/transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub tx_hash: TxHash,
}

/// Machine-readable error category in `ApiErrorBody`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    UnknownRegistry,
    Pending,
    InvalidRequest,
    RateLimited,
    Internal,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: ApiErrorCode,
    pub error: String,
    /// Registry the error refers to, for `unknown_registry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<Address>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_deserializes_minimal() {
        let json = r#"{ "code": "rate_limited", "error": "slow down" }"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.code, ApiErrorCode::RateLimited);
        assert!(body.registry.is_none());
    }

    #[test]
    fn test_chain_info_shape() {
        let info = ChainInfo {
            chain_id: ChainId(80001),
            block_number: 12,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"chain_id":80001,"block_number":12}"#);
    }
}
