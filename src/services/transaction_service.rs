use crate::config::IdempotencySettings;
use crate::error::{AppError, Result};
use crate::idempotency::{
    Decision, IdempotencyCoordinator, IdempotencyMetrics, PgIdempotencyStore, ProtectedOperation,
    RedisRecordCache, TieredLookup, WriteThroughExecutor,
};
use crate::models::{TransactionRecord, TransactionType};
use crate::repositories::TransactionRepository;
use async_trait::async_trait;
use http::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

/// Validated command for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionCommand {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub consumer_id: String,
}

/// Outcome of an idempotent create: a fresh execution or a verbatim replay
/// of a previously recorded response.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(TransactionRecord),
    Replayed(serde_json::Value),
}

/// Protected operation: insert one transaction row. Runs inside the
/// executor's database transaction.
struct InsertTransaction {
    repository: TransactionRepository,
    command: CreateTransactionCommand,
}

#[async_trait]
impl ProtectedOperation for InsertTransaction {
    type Output = TransactionRecord;

    async fn run(&self, tx: &mut Transaction<'_, Postgres>) -> Result<Self::Output> {
        let record = TransactionRecord::new(
            self.command.transaction_type,
            self.command.amount,
            self.command.consumer_id.clone(),
        );
        self.repository.insert_in_tx(tx, &record).await
    }
}

/// Orchestrates the idempotent create path: admission, write-through
/// execution, and reconciliation of the admission race.
pub struct TransactionService {
    pool: PgPool,
    coordinator: IdempotencyCoordinator,
    executor: WriteThroughExecutor,
}

impl TransactionService {
    pub fn new(
        pool: PgPool,
        redis_client: redis::Client,
        settings: IdempotencySettings,
        metrics: Arc<IdempotencyMetrics>,
    ) -> Self {
        let store = Arc::new(PgIdempotencyStore::new(pool.clone()));
        let cache = Arc::new(RedisRecordCache::new(redis_client, &settings.key_prefix));

        let lookup = TieredLookup::new(vec![cache.clone(), store.clone()]);
        let coordinator = IdempotencyCoordinator::with_metrics(lookup, metrics);
        let executor =
            WriteThroughExecutor::new(pool.clone(), store, cache, settings.ttl_seconds());

        Self {
            pool,
            coordinator,
            executor,
        }
    }

    /// Creates a transaction at most once per idempotency key. Two
    /// concurrent admissions for the same key may both reach the executor;
    /// the unique constraint on the idempotency record decides the winner,
    /// and the loser re-runs the lookup path, which then observes the
    /// winner's record.
    pub async fn create(
        &self,
        method: &Method,
        idempotency_key: Option<&str>,
        raw_body: &[u8],
        command: CreateTransactionCommand,
    ) -> Result<CreateOutcome> {
        validate_command(&command)?;

        let operation = InsertTransaction {
            repository: TransactionRepository::new(self.pool.clone()),
            command,
        };

        // Two admission attempts: the second only ever runs after losing a
        // unique-constraint race, at which point the winner's record exists
        // and the lookup resolves to Replay (or a terminal rejection).
        for _ in 0..2 {
            match self.coordinator.admit(method, idempotency_key, raw_body).await? {
                Decision::Replay(payload) => return Ok(CreateOutcome::Replayed(payload)),
                Decision::Admit(ticket) => {
                    match self.executor.execute(&ticket, &operation).await {
                        Ok(record) => return Ok(CreateOutcome::Created(record)),
                        Err(e) if e.is_unique_violation() => {
                            tracing::debug!(
                                "Lost idempotency admission race, re-running lookup path"
                            );
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "Idempotency admission did not converge after losing the insert race"
        )))
    }

    pub async fn find_transaction(&self, id: uuid::Uuid) -> Result<TransactionRecord> {
        TransactionRepository::new(self.pool.clone())
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction '{}' not found", id)))
    }
}

fn validate_command(command: &CreateTransactionCommand) -> Result<()> {
    if command.amount <= Decimal::ZERO {
        return Err(AppError::Validation("amount must be positive".to_string()));
    }
    if command.consumer_id.trim().is_empty() {
        return Err(AppError::Validation("consumerId cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_command_rejects_non_positive_amount() {
        let command = CreateTransactionCommand {
            transaction_type: TransactionType::Payment,
            amount: dec!(0),
            consumer_id: "2e37f6".to_string(),
        };
        assert!(matches!(
            validate_command(&command),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_command_rejects_blank_consumer() {
        let command = CreateTransactionCommand {
            transaction_type: TransactionType::Payment,
            amount: dec!(120.00),
            consumer_id: "  ".to_string(),
        };
        assert!(matches!(
            validate_command(&command),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_command_accepts_valid_input() {
        let command = CreateTransactionCommand {
            transaction_type: TransactionType::Transfer,
            amount: dec!(120.00),
            consumer_id: "2e37f6".to_string(),
        };
        assert!(validate_command(&command).is_ok());
    }
}
