use crate::error::{AppError, Result};
use crate::models::TransactionRecord;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Data access for transactions.
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a transaction inside a caller-owned database transaction so
    /// the business effect commits or rolls back together with its
    /// idempotency record.
    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &TransactionRecord,
    ) -> Result<TransactionRecord> {
        let inserted = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO transactions (id, transaction_type, amount, consumer_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, transaction_type, amount, consumer_id, created_at
            "#,
        )
        .bind(record.id)
        .bind(record.transaction_type)
        .bind(record.amount)
        .bind(&record.consumer_id)
        .bind(record.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(inserted)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, transaction_type, amount, consumer_id, created_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(record)
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.0)
    }
}
