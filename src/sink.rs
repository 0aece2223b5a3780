// =============================================================================
// sink.rs — THE DETECTIONS SINK
// =============================================================================
//
// Idempotent REST upsert against the external detections store.
// Grounded in the teacher's `publisher.rs`: same stats-struct-plus-atomic-
// counters shape, same structured log-on-every-outcome discipline, adapted
// from a Redis pub/sub + sorted-set target to a sequential per-cycle REST
// write. Duplicate rows (409, or a 4xx body naming a unique-constraint
// violation) are not errors — they're counted and treated as success,
// because the database's unique index on `listing_url` is the system's
// actual dedup authority; the in-memory cache in `dedup.rs` is only there to
// avoid wasting the round trip most of the time.
// =============================================================================

use anyhow::Result;
use portable_atomic::{AtomicU64, Ordering};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::SinkErrorKind;
use crate::models::Detection;

pub struct SinkStats {
    pub stored: AtomicU64,
    pub duplicates: AtomicU64,
    pub errors: AtomicU64,
}

impl SinkStats {
    fn new() -> Self {
        Self {
            stored: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SinkSnapshot {
    pub stored: u64,
    pub duplicates: u64,
    pub errors: u64,
}

/// Idempotent writer to the detections table (C7).
pub struct Sink {
    client: Client,
    database_url: String,
    database_api_key: String,
    pub stats: SinkStats,
}

impl Sink {
    pub fn new(client: Client, database_url: String, database_api_key: String) -> Self {
        Self {
            client,
            database_url,
            database_api_key,
            stats: SinkStats::new(),
        }
    }

    /// Insert a single detection row. Returns `Ok(())` for both a fresh
    /// store and a classified duplicate — only genuine transport/database
    /// failures surface as `Err`.
    pub async fn insert(&self, detection: &Detection) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/detections", self.database_url.trim_end_matches('/')))
            .bearer_auth(&self.database_api_key)
            .json(detection)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    evidence_id = %detection.evidence_id,
                    error = %e,
                    "sink transport error — row lost for this cycle, relying on re-discovery"
                );
                return Err(SinkErrorKind::DatabaseError(e.to_string()).into());
            }
        };

        let status = response.status();

        if status.is_success() {
            self.stats.stored.fetch_add(1, Ordering::Relaxed);
            info!(
                evidence_id = %detection.evidence_id,
                platform = %detection.platform,
                threat_level = %detection.threat_level,
                "detection stored"
            );
            return Ok(());
        }

        if status.as_u16() == 409 {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(evidence_id = %detection.evidence_id, "duplicate listing_url — non-error");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() && looks_like_unique_violation(&body) {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(evidence_id = %detection.evidence_id, "unique-constraint violation in response body — classified as duplicate");
            return Ok(());
        }

        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        Err(SinkErrorKind::DatabaseError(format!("status {status}: {body}")).into())
    }

    pub fn snapshot(&self) -> SinkSnapshot {
        SinkSnapshot {
            stored: self.stats.stored.load(Ordering::Relaxed),
            duplicates: self.stats.duplicates.load(Ordering::Relaxed),
            errors: self.stats.errors.load(Ordering::Relaxed),
        }
    }
}

fn looks_like_unique_violation(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["unique constraint", "unique violation", "duplicate key", "already exists"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_unique_violation_bodies() {
        assert!(looks_like_unique_violation("duplicate key value violates unique constraint"));
        assert!(looks_like_unique_violation("Row already exists"));
        assert!(!looks_like_unique_violation("internal server error"));
    }
}
