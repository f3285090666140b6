//! Block height feed.
//!
//! One background task polls the chain head and publishes a height only when
//! it is strictly greater than the last one published. The channel holds a
//! single slot: a slow consumer sees the latest height and skips the ones it
//! missed.

use crate::rpc::ChainRpc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls the chain head and publishes new heights.
pub struct BlockScheduler {
    rpc: Arc<dyn ChainRpc>,
    poll_interval: Duration,
}

/// Consumer end of the block feed.
pub struct BlockTicks {
    rx: watch::Receiver<u64>,
}

impl BlockTicks {
    /// Wait for the next new height; `None` once the scheduler has stopped.
    pub async fn next(&mut self) -> Option<u64> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

impl BlockScheduler {
    pub fn new(rpc: Arc<dyn ChainRpc>, poll_interval: Duration) -> Self {
        Self { rpc, poll_interval }
    }

    /// Start polling in the background until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> (BlockTicks, JoinHandle<()>) {
        let (tx, rx) = watch::channel(0u64);
        let handle = tokio::spawn(self.run(tx, cancel));
        (BlockTicks { rx }, handle)
    }

    async fn run(self, tx: watch::Sender<u64>, cancel: CancellationToken) {
        let mut last = 0u64;
        info!(interval_ms = self.poll_interval.as_millis() as u64, "Block scheduler started");

        loop {
            match self.rpc.block_number().await {
                Ok(height) if height > last => {
                    last = height;
                    debug!(height, "New block");
                    if tx.send(height).is_err() {
                        debug!("Block consumer dropped, stopping scheduler");
                        return;
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to poll block height"),
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                () = cancel.cancelled() => {
                    info!(last_height = last, "Block scheduler stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::MockChainRpc;

    #[tokio::test]
    async fn test_emits_only_increasing_heights() {
        let rpc = Arc::new(MockChainRpc::new());
        for height in [Some(5), Some(5), None, Some(4), Some(6)] {
            rpc.push_block(height);
        }

        let cancel = CancellationToken::new();
        let scheduler = BlockScheduler::new(rpc, Duration::from_millis(1));
        let (mut ticks, handle) = scheduler.spawn(cancel.clone());

        let mut seen = Vec::new();
        while let Some(height) = ticks.next().await {
            seen.push(height);
            if height == 6 {
                break;
            }
        }

        // A slow consumer may skip 5, but never sees a repeat or a decrease.
        assert!(seen == vec![5, 6] || seen == vec![6]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_ticks_end_when_scheduler_stops() {
        let rpc = Arc::new(MockChainRpc::new());
        let cancel = CancellationToken::new();
        let (mut ticks, handle) =
            BlockScheduler::new(rpc, Duration::from_millis(1)).spawn(cancel.clone());

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(ticks.next().await, None);
    }
}
