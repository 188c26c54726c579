use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// Durable idempotency record. The cache tier stores a strict copy of this
/// shape so comparison logic upstream is backend-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub idempotency_key: String,
    pub body_hash: String,
    pub response_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(
        idempotency_key: String,
        body_hash: String,
        response_payload: serde_json::Value,
        ttl_seconds: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            idempotency_key,
            body_hash,
            response_payload,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Seconds of validity left. Used to bound the cache TTL.
    pub fn remaining_ttl_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

/// One lookup tier. Tiers are consulted in fixed priority order and must
/// all return the same record shape.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn find(&self, idempotency_key: &str) -> Result<Option<IdempotencyRecord>>;
}

/// PostgreSQL-backed idempotency storage, the authoritative tier. The
/// UNIQUE constraint on `idempotency_key` is the sole mutual-exclusion
/// mechanism between concurrent admissions.
pub struct PgIdempotencyStore {
    pool: PgPool,
}

impl PgIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a record by key alone. Hash comparison is the coordinator's
    /// job; filtering by the current body hash here would let a genuine
    /// conflict fall through to a second admission.
    pub async fn find_by_key(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let record = sqlx::query_as::<_, IdempotencyRecord>(
            r#"
            SELECT id, idempotency_key, body_hash, response_payload, created_at, updated_at, expires_at
            FROM idempotency_records
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(record)
    }

    /// Inserts a record inside a caller-owned transaction so it commits or
    /// rolls back together with the protected business effect. A unique
    /// violation on `idempotency_key` surfaces to the caller unchanged.
    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &IdempotencyRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO idempotency_records (id, idempotency_key, body_hash, response_payload, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.idempotency_key)
        .bind(&record.body_hash)
        .bind(&record.response_payload)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.expires_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Deletes expired records. Retention is a background concern; expired
    /// records are already inert for replay whether or not this runs.
    pub async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM idempotency_records
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM idempotency_records
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordLookup for PgIdempotencyStore {
    async fn find(&self, idempotency_key: &str) -> Result<Option<IdempotencyRecord>> {
        self.find_by_key(idempotency_key).await
    }
}

/// Redis-backed cache tier. Never the sole source of truth: every read
/// error degrades to a miss so the durable tier is consulted instead.
pub struct RedisRecordCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRecordCache {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn cache_key(&self, idempotency_key: &str) -> String {
        format!("{}:{}", self.key_prefix, idempotency_key)
    }

    /// Best-effort write after a durable commit. TTL is bounded by the
    /// record's remaining validity window; nothing is written for a record
    /// that is already past it.
    pub async fn put(&self, record: &IdempotencyRecord) -> Result<()> {
        let ttl = record.remaining_ttl_seconds();
        if ttl <= 0 {
            return Ok(());
        }

        let json = serde_json::to_string(record).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize idempotency record: {}", e))
        })?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(AppError::Redis)?;

        let key = self.cache_key(&record.idempotency_key);
        let _: () = conn
            .set_ex(&key, json, ttl as u64)
            .await
            .map_err(AppError::Redis)?;

        Ok(())
    }

    pub async fn delete(&self, idempotency_key: &str) -> Result<bool> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(AppError::Redis)?;

        let key = self.cache_key(idempotency_key);
        let deleted: i64 = conn.del(&key).await.map_err(AppError::Redis)?;

        Ok(deleted > 0)
    }
}

#[async_trait]
impl RecordLookup for RedisRecordCache {
    async fn find(&self, idempotency_key: &str) -> Result<Option<IdempotencyRecord>> {
        let key = self.cache_key(idempotency_key);

        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Redis connection error in cache lookup: {}", e);
                return Ok(None);
            }
        };

        let value: Option<String> = match conn.get(&key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Redis get error: {}", e);
                return Ok(None);
            }
        };

        match value {
            Some(json) => match serde_json::from_str::<IdempotencyRecord>(&json) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    tracing::warn!("Failed to deserialize cached idempotency record: {}", e);
                    self.delete(idempotency_key).await.ok();
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

/// Cache-then-durable lookup path. The first tier to produce a record wins;
/// a total miss means the key has never been admitted (or its record was
/// cleaned up after expiry).
pub struct TieredLookup {
    tiers: Vec<Arc<dyn RecordLookup>>,
}

impl TieredLookup {
    pub fn new(tiers: Vec<Arc<dyn RecordLookup>>) -> Self {
        Self { tiers }
    }

    pub async fn find(&self, idempotency_key: &str) -> Result<Option<IdempotencyRecord>> {
        for tier in &self.tiers {
            if let Some(record) = tier.find(idempotency_key).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_ttl(ttl_seconds: i64) -> IdempotencyRecord {
        IdempotencyRecord::new(
            "key-1".to_string(),
            "hash-1".to_string(),
            serde_json::json!({"id": "tx-1"}),
            ttl_seconds,
        )
    }

    #[test]
    fn test_record_expiry() {
        assert!(!record_with_ttl(3600).is_expired());
        assert!(record_with_ttl(-1).is_expired());
    }

    #[test]
    fn test_remaining_ttl_tracks_expiry() {
        let fresh = record_with_ttl(3600);
        assert!(fresh.remaining_ttl_seconds() > 3500);

        let stale = record_with_ttl(-60);
        assert!(stale.remaining_ttl_seconds() <= 0);
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = record_with_ttl(3600);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: IdempotencyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.body_hash, record.body_hash);
        assert_eq!(parsed.response_payload, record.response_payload);
    }

    #[tokio::test]
    async fn test_tiered_lookup_prefers_first_tier() {
        let mut cache = MockRecordLookup::new();
        let hit = record_with_ttl(3600);
        let hit_clone = hit.clone();
        cache
            .expect_find()
            .returning(move |_| Ok(Some(hit_clone.clone())));

        let mut durable = MockRecordLookup::new();
        durable.expect_find().never();

        let lookup = TieredLookup::new(vec![Arc::new(cache), Arc::new(durable)]);
        let found = lookup.find("key-1").await.unwrap().unwrap();
        assert_eq!(found.id, hit.id);
    }

    #[tokio::test]
    async fn test_tiered_lookup_falls_through_on_miss() {
        let mut cache = MockRecordLookup::new();
        cache.expect_find().times(1).returning(|_| Ok(None));

        let mut durable = MockRecordLookup::new();
        let hit = record_with_ttl(3600);
        let hit_clone = hit.clone();
        durable
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(hit_clone.clone())));

        let lookup = TieredLookup::new(vec![Arc::new(cache), Arc::new(durable)]);
        let found = lookup.find("key-1").await.unwrap().unwrap();
        assert_eq!(found.id, hit.id);
    }

    #[tokio::test]
    async fn test_tiered_lookup_total_miss() {
        let mut cache = MockRecordLookup::new();
        cache.expect_find().returning(|_| Ok(None));
        let mut durable = MockRecordLookup::new();
        durable.expect_find().returning(|_| Ok(None));

        let lookup = TieredLookup::new(vec![Arc::new(cache), Arc::new(durable)]);
        assert!(lookup.find("missing").await.unwrap().is_none());
    }
}
