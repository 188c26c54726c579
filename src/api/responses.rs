use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{TransactionRecord, TransactionType};

/// Standard response envelope: `data` carries the business result on
/// success or replay, `error` a human-readable detail string on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub error: Option<String>,
    pub data: Option<T>,
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            data: Some(data),
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(
        message: impl Into<String>,
        error: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            error: Some(error.into()),
            data: None,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Transaction response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub consumer_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionResponse {
    fn from(tx: TransactionRecord) -> Self {
        Self {
            id: tx.id,
            transaction_type: tx.transaction_type,
            amount: tx.amount,
            consumer_id: tx.consumer_id,
            created_at: tx.created_at,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

/// Service health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub database: bool,
    pub redis: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_shape_on_success() {
        let envelope = ApiResponse::success("Transaction created", 42, "/transactions");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["message"], "Transaction created");
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["data"], 42);
        assert_eq!(json["path"], "/transactions");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_envelope_shape_on_error() {
        let envelope = ApiResponse::<()>::error(
            "Transaction request rejected",
            "Idempotency key was already used with a different request body",
            "/transactions",
        );
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(
            json["error"],
            "Idempotency key was already used with a different request body"
        );
    }

    #[test]
    fn test_transaction_response_wire_form() {
        let record = TransactionRecord::new(TransactionType::Payment, dec!(12000), "2e37f6".into());
        let response = TransactionResponse::from(record.clone());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["type"], "payment");
        assert_eq!(json["consumerId"], "2e37f6");
        assert_eq!(json["id"], record.id.to_string());
    }

    #[test]
    fn test_record_and_response_share_wire_form() {
        // The executor records the serialized record; retries replay it
        // verbatim, so it must match what the first response carried.
        let record = TransactionRecord::new(TransactionType::Payment, dec!(12000), "2e37f6".into());
        let from_record = serde_json::to_value(&record).unwrap();
        let from_response = serde_json::to_value(TransactionResponse::from(record)).unwrap();
        assert_eq!(from_record, from_response);
    }
}
