use crate::error::{AppError, Result};
use crate::idempotency::coordinator::AdmissionTicket;
use crate::idempotency::store::{IdempotencyRecord, PgIdempotencyStore, RedisRecordCache};
use crate::observability::logging::mask_sensitive;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

/// The business effect being protected. The executor treats it as opaque:
/// it runs inside the executor's transaction and must return a serializable
/// result.
#[async_trait]
pub trait ProtectedOperation: Send + Sync {
    type Output: Serialize + Send;

    async fn run(&self, tx: &mut Transaction<'_, Postgres>) -> Result<Self::Output>;
}

/// Runs an admitted operation and commits its effect together with the
/// idempotency record as one atomic unit, then opportunistically populates
/// the cache.
pub struct WriteThroughExecutor {
    pool: PgPool,
    store: Arc<PgIdempotencyStore>,
    cache: Arc<RedisRecordCache>,
    ttl_seconds: i64,
}

impl WriteThroughExecutor {
    pub fn new(
        pool: PgPool,
        store: Arc<PgIdempotencyStore>,
        cache: Arc<RedisRecordCache>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            pool,
            store,
            cache,
            ttl_seconds,
        }
    }

    /// Executes the protected operation. Any failure from the operation or
    /// the record insert aborts the whole transaction; the business effect
    /// and the idempotency record vanish together. Unique violations on the
    /// record insert propagate unchanged so the caller can reconcile the
    /// admission race.
    pub async fn execute<O: ProtectedOperation>(
        &self,
        ticket: &AdmissionTicket,
        operation: &O,
    ) -> Result<O::Output> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let output = operation.run(&mut tx).await?;

        let response_payload = serde_json::to_value(&output).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize operation result: {}", e))
        })?;

        let record = IdempotencyRecord::new(
            ticket.idempotency_key.clone(),
            ticket.body_hash.clone(),
            response_payload,
            self.ttl_seconds,
        );

        self.store.insert_in_tx(&mut tx, &record).await?;

        tx.commit().await.map_err(AppError::Database)?;

        // Cache write happens strictly after commit and is an optimization,
        // not a dependency of correctness.
        if let Err(e) = self.cache.put(&record).await {
            tracing::warn!(
                key = %mask_sensitive(&record.idempotency_key, 4),
                "Failed to cache idempotency record after commit: {}",
                e
            );
        }

        Ok(output)
    }
}
