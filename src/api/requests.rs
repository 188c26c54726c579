use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::TransactionType;
use crate::services::CreateTransactionCommand;

/// Request to create a new transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    #[serde(rename = "consumerId")]
    pub consumer_id: String,
}

impl CreateTransactionRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.amount <= Decimal::ZERO {
            errors.push(ValidationError {
                field: "amount".to_string(),
                message: "amount must be positive".to_string(),
            });
        }
        if self.consumer_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "consumerId".to_string(),
                message: "consumerId cannot be empty".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<CreateTransactionRequest> for CreateTransactionCommand {
    fn from(request: CreateTransactionRequest) -> Self {
        Self {
            transaction_type: request.transaction_type,
            amount: request.amount,
            consumer_id: request.consumer_id,
        }
    }
}

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_wire_format() {
        let body = r#"{"type":"payment","amount":12000,"consumerId":"2e37f6"}"#;
        let request: CreateTransactionRequest = serde_json::from_str(body).unwrap();

        assert_eq!(request.transaction_type, TransactionType::Payment);
        assert_eq!(request.amount, dec!(12000));
        assert_eq!(request.consumer_id, "2e37f6");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let request = CreateTransactionRequest {
            transaction_type: TransactionType::Payment,
            amount: dec!(-5),
            consumer_id: "".to_string(),
        };

        let errors = request.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
