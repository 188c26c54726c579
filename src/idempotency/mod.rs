pub mod cleanup;
pub mod coordinator;
pub mod executor;
pub mod fingerprint;
pub mod store;

pub use cleanup::IdempotencyCleanupJob;
pub use coordinator::{
    AdmissionTicket, Decision, IdempotencyCoordinator, IdempotencyMetrics, MetricsSnapshot,
};
pub use executor::{ProtectedOperation, WriteThroughExecutor};
pub use fingerprint::fingerprint;
pub use store::{
    IdempotencyRecord, PgIdempotencyStore, RecordLookup, RedisRecordCache, TieredLookup,
};
