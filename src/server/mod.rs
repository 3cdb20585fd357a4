// Allowlist node: serves a ledger over HTTP
//
// Hosts the in-process ledger, runs the block producer and exposes the JSON
// API that `HttpProvider` speaks.

pub mod api_types;
mod handlers;
mod middleware;

pub use handlers::{create_router, health_check, metrics_endpoint, ApiError};
pub use middleware::RateLimiter;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::chain::ChainId;
use crate::config::constants::RATE_LIMIT_IDLE_SECS;
use crate::config::NodeConfig;
use crate::ledger::{spawn_block_producer, Ledger};
use crate::metrics::NodeMetrics;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub metrics: Arc<NodeMetrics>,
    pub limiter: RateLimiter,
}

impl AppState {
    /// Fresh ledger on `chain_id` with metrics attached.
    pub fn new(chain_id: ChainId, limiter: RateLimiter) -> Result<Self> {
        let metrics = Arc::new(NodeMetrics::new()?);
        let ledger = Arc::new(Ledger::new(chain_id).with_metrics(Arc::clone(&metrics)));
        Ok(Self {
            ledger,
            metrics,
            limiter,
        })
    }
}

pub struct NodeServer {
    config: NodeConfig,
    state: AppState,
}

impl NodeServer {
    /// Build a node from config, restoring the ledger snapshot if one exists.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let chain_id = ChainId(config.chain_id);
        let metrics = Arc::new(NodeMetrics::new()?);
        let ledger = match &config.state_path {
            Some(path) => Ledger::load_or_create(chain_id, path)?,
            None => Ledger::new(chain_id),
        };
        let state = AppState {
            ledger: Arc::new(ledger.with_metrics(Arc::clone(&metrics))),
            metrics,
            limiter: RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst),
        };
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.config.bind_address))?;

        let producer = spawn_block_producer(
            Arc::clone(&self.state.ledger),
            self.config.block_interval(),
            self.config.state_path.clone(),
        );

        let limiter = self.state.limiter.clone();
        let purger = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                limiter.purge_idle(RATE_LIMIT_IDLE_SECS);
            }
        });

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(
            %addr,
            chain_id = %self.state.ledger.chain_id(),
            block_interval_ms = self.config.block_interval_ms,
            "Allowlist node listening"
        );

        let app = create_router(self.state.clone());
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await
            .context("Node server failed");

        producer.abort();
        purger.abort();
        if let Some(path) = &self.config.state_path {
            self.state.ledger.save_snapshot(path).await?;
        }
        result
    }
}
