use crate::error::{AppError, Result};
use crate::idempotency::fingerprint::fingerprint;
use crate::idempotency::store::TieredLookup;
use crate::observability::logging::mask_sensitive;
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Methods the idempotency mechanism protects.
const MUTATING_METHODS: [Method; 3] = [Method::POST, Method::PUT, Method::PATCH];

/// Outcome of the admission decision procedure.
#[derive(Debug)]
pub enum Decision {
    /// A completed record exists for this key and payload; return the
    /// recorded response verbatim without re-executing anything.
    Replay(serde_json::Value),
    /// No record exists; the caller is authorized to execute the protected
    /// operation exactly once for this fingerprint.
    Admit(AdmissionTicket),
}

/// Proof of admission handed to the write-through executor.
#[derive(Debug, Clone)]
pub struct AdmissionTicket {
    pub idempotency_key: String,
    pub body_hash: String,
}

/// Counters for admission outcomes.
#[derive(Debug, Default)]
pub struct IdempotencyMetrics {
    pub total_requests: AtomicU64,
    pub replayed: AtomicU64,
    pub admitted: AtomicU64,
    pub conflicts: AtomicU64,
    pub expired: AtomicU64,
}

impl IdempotencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self) {
        self.replayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub replayed: u64,
    pub admitted: u64,
    pub conflicts: u64,
    pub expired: u64,
}

impl MetricsSnapshot {
    pub fn replay_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.replayed as f64 / self.total_requests as f64
        }
    }
}

/// The admission decision procedure. Stateless between calls apart from
/// counters; performs no writes, only the two-tier read lookup. Actual
/// mutual exclusion lives in the durable store's unique constraint.
pub struct IdempotencyCoordinator {
    lookup: TieredLookup,
    metrics: Arc<IdempotencyMetrics>,
}

impl IdempotencyCoordinator {
    pub fn new(lookup: TieredLookup) -> Self {
        Self {
            lookup,
            metrics: Arc::new(IdempotencyMetrics::new()),
        }
    }

    pub fn with_metrics(lookup: TieredLookup, metrics: Arc<IdempotencyMetrics>) -> Self {
        Self { lookup, metrics }
    }

    pub fn metrics(&self) -> Arc<IdempotencyMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Decides whether a request may proceed. Validation failures are
    /// reported before any store access.
    pub async fn admit(
        &self,
        method: &Method,
        idempotency_key: Option<&str>,
        raw_body: &[u8],
    ) -> Result<Decision> {
        self.metrics.record_request();

        if !MUTATING_METHODS.contains(method) {
            return Err(AppError::MethodNotAllowed(format!(
                "{} requests are not covered by idempotency keys",
                method
            )));
        }

        let key = match idempotency_key {
            Some(k) if !k.trim().is_empty() => k,
            _ => {
                return Err(AppError::InvalidKey(
                    "Idempotency key header is required and must be non-empty".to_string(),
                ));
            }
        };

        let body_hash = fingerprint(raw_body);

        match self.lookup.find(key).await? {
            Some(record) => {
                if record.body_hash != body_hash {
                    self.metrics.record_conflict();
                    tracing::warn!(
                        key = %mask_sensitive(key, 4),
                        "Idempotency key reused with a different payload"
                    );
                    return Err(AppError::KeyConflict(
                        "Idempotency key was already used with a different request body"
                            .to_string(),
                    ));
                }

                if record.is_expired() {
                    self.metrics.record_expired();
                    return Err(AppError::KeyExpired(
                        "Idempotency key is past its validity window".to_string(),
                    ));
                }

                self.metrics.record_replay();
                tracing::debug!(key = %mask_sensitive(key, 4), "Replaying recorded response");
                Ok(Decision::Replay(record.response_payload))
            }
            None => {
                self.metrics.record_admission();
                Ok(Decision::Admit(AdmissionTicket {
                    idempotency_key: key.to_string(),
                    body_hash,
                }))
            }
        }
    }
}
