use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Payment,
    Transfer,
    Refund,
}

/// The business entity protected by the idempotency mechanism. The
/// coordinator itself is agnostic of this shape; it only sees the
/// serialized response. Serializes to the same wire form as the response
/// DTO so a recorded payload replays byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub consumer_id: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(transaction_type: TransactionType, amount: Decimal, consumer_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type,
            amount,
            consumer_id,
            created_at: Utc::now(),
        }
    }
}
