// HTTP provider: talks to an `allowlist node` over its JSON API.
//
// API contract (served by `crate::server`):
//
//   GET  /v1/chain                          -> ChainInfo
//   POST /v1/transactions                   -> SubmitResponse
//   GET  /v1/transactions/{hash}/receipt    -> Receipt, 404 while pending
//   POST /v1/registries/{address}/call      -> QueryResult
//
// Every connectivity problem surfaces as `TransportFailure`; the caller
// decides whether to retry.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use super::Provider;
use crate::chain::{Address, ChainId, TxHash};
use crate::errors::{AllowlistError, Result};
use crate::ledger::{Query, QueryResult, Receipt, TransactionRequest};
use crate::server::api_types::{ApiErrorBody, ApiErrorCode, ChainInfo, SubmitResponse};

pub struct HttpProvider {
    base_url: String,
    http: Client,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AllowlistError::TransportFailure(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch chain id and current height.
    pub async fn chain_info(&self) -> Result<ChainInfo> {
        let url = format!("{}/v1/chain", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<ChainInfo>().await?)
    }

    /// Turn a non-success response into the matching error.
    async fn check(resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(ApiErrorBody {
                code: ApiErrorCode::UnknownRegistry,
                registry: Some(registry),
                ..
            }) => Err(AllowlistError::UnknownRegistry(registry)),
            Ok(body) => Err(AllowlistError::TransportFailure(format!(
                "Node API error {}: {}",
                status, body.error
            ))),
            Err(_) => Err(AllowlistError::TransportFailure(format!(
                "Node API error {}: {}",
                status, text
            ))),
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn chain_id(&self) -> Result<ChainId> {
        Ok(self.chain_info().await?.chain_id)
    }

    async fn call(&self, registry: Address, query: Query) -> Result<QueryResult> {
        let url = format!("{}/v1/registries/{}/call", self.base_url, registry);
        let resp = self.http.post(&url).json(&query).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<QueryResult>().await?)
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxHash> {
        let url = format!("{}/v1/transactions", self.base_url);
        let resp = self.http.post(&url).json(request).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<SubmitResponse>().await?.tx_hash)
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>> {
        let url = format!("{}/v1/transactions/{}/receipt", self.base_url, tx_hash);
        let resp = self.http.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check(resp).await?;
        Ok(Some(resp.json::<Receipt>().await?))
    }

    fn name(&self) -> &str {
        "http"
    }
}
