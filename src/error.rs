use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid idempotency key: {0}")]
    InvalidKey(String),

    #[error("Method not eligible for idempotency protection: {0}")]
    MethodNotAllowed(String),

    #[error("Idempotency key conflict: {0}")]
    KeyConflict(String),

    #[error("Idempotency key expired: {0}")]
    KeyExpired(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl AppError {
    /// Maps the error to the HTTP status code of the external contract.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidKey(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::KeyConflict(_) => StatusCode::CONFLICT,
            // 419 is outside the IANA registry but part of the wire contract
            // for expired idempotency keys.
            AppError::KeyExpired(_) => {
                StatusCode::from_u16(419).unwrap_or(StatusCode::BAD_REQUEST)
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-facing detail string. Storage internals never leak here.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidKey(msg)
            | AppError::MethodNotAllowed(msg)
            | AppError::KeyConflict(msg)
            | AppError::KeyExpired(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// True if this is a Postgres unique-constraint violation. The losing
    /// side of an admission race sees this on its idempotency insert and
    /// must re-run the lookup path instead of surfacing the raw error.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}
