pub mod transaction_service;

pub use transaction_service::{CreateOutcome, CreateTransactionCommand, TransactionService};
