// Node metrics: Prometheus counters for block production and the
// transaction pool, rendered at GET /metrics.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

pub struct NodeMetrics {
    registry: Registry,
    pub blocks_produced: IntCounter,
    pub transactions_submitted: IntCounter,
    pub transactions_applied: IntCounter,
    pub transactions_reverted: IntCounter,
    pub pending_transactions: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("allowlist".to_string()), None)
            .context("Failed to create metrics registry")?;

        let blocks_produced = IntCounter::new("blocks_produced_total", "Blocks produced")?;
        let transactions_submitted =
            IntCounter::new("transactions_submitted_total", "Transactions accepted into the pool")?;
        let transactions_applied =
            IntCounter::new("transactions_applied_total", "Transactions applied in a block")?;
        let transactions_reverted =
            IntCounter::new("transactions_reverted_total", "Applied transactions that reverted")?;
        let pending_transactions =
            IntGauge::new("pending_transactions", "Transactions waiting for a block")?;

        registry.register(Box::new(blocks_produced.clone()))?;
        registry.register(Box::new(transactions_submitted.clone()))?;
        registry.register(Box::new(transactions_applied.clone()))?;
        registry.register(Box::new(transactions_reverted.clone()))?;
        registry.register(Box::new(pending_transactions.clone()))?;

        Ok(Self {
            registry,
            blocks_produced,
            transactions_submitted,
            transactions_applied,
            transactions_reverted,
            pending_transactions,
        })
    }

    /// Prometheus text exposition of every metric.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_prefixed_names() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.blocks_produced.inc();
        metrics.pending_transactions.set(3);

        let text = metrics.render().unwrap();
        assert!(text.contains("allowlist_blocks_produced_total 1"));
        assert!(text.contains("allowlist_pending_transactions 3"));
    }
}
