use crate::error::Result;
use crate::idempotency::store::PgIdempotencyStore;
use std::sync::Arc;

/// Background retention sweep for expired idempotency records. Replay
/// correctness never depends on this running; expired records are already
/// inert.
pub struct IdempotencyCleanupJob {
    store: Arc<PgIdempotencyStore>,
    interval_seconds: u64,
}

impl IdempotencyCleanupJob {
    pub fn new(store: Arc<PgIdempotencyStore>, interval_seconds: u64) -> Self {
        Self {
            store,
            interval_seconds,
        }
    }

    pub async fn run_once(&self) -> Result<u64> {
        self.store.delete_expired().await
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(self.interval_seconds));

            loop {
                interval.tick().await;

                match self.store.delete_expired().await {
                    Ok(count) => {
                        if count > 0 {
                            tracing::info!("Cleaned up {} expired idempotency records", count);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to clean up expired idempotency records: {}", e);
                    }
                }
            }
        })
    }
}
