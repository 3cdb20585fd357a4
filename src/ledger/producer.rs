// Block producer: drains the pending pool on a fixed interval.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::Ledger;

/// Spawn a background task that produces a block every `interval`.
///
/// When `snapshot` is set, the ledger state is written there after each
/// non-empty block.
pub fn spawn_block_producer(
    ledger: Arc<Ledger>,
    interval: Duration,
    snapshot: Option<PathBuf>,
) -> JoinHandle<()> {
    info!(interval_ms = interval.as_millis() as u64, "Starting block producer");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let receipts = ledger.produce_block().await;
            if receipts.is_empty() {
                continue;
            }
            if let Some(path) = &snapshot {
                if let Err(e) = ledger.save_snapshot(path).await {
                    error!(error = %e, "Failed to persist ledger snapshot");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Address, ChainId};
    use crate::ledger::{Call, TransactionRequest};

    #[tokio::test(start_paused = true)]
    async fn test_producer_confirms_pending_transactions() {
        let ledger = Arc::new(Ledger::new(ChainId(80001)));
        let handle = spawn_block_producer(Arc::clone(&ledger), Duration::from_millis(100), None);

        let hash = ledger
            .submit(TransactionRequest::new(
                Address::from_seed("deployer"),
                Call::Deploy { capacity: 2 },
            ))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(ledger.receipt(&hash).await.unwrap().is_success());
        assert_eq!(ledger.block_number().await, 1);
        handle.abort();
    }
}
