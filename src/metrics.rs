// =============================================================================
// metrics.rs — THE METRICS ENDPOINT
// =============================================================================
//
// Lock-free atomic counters, serialized to JSON by a bare
// `tokio::net::TcpListener` loop — no web framework. Same shape as the
// teacher's `metrics.rs`, with per-scanner breakdowns swapped for
// per-platform breakdowns across the eleven marketplaces this pipeline
// watches, and Redis/bloom-filter counters swapped for sink and dedup-cache
// counters.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info};
use serde::Serialize;

use crate::models::Platform;

#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub listings_scanned: u64,
    pub listings_accepted: u64,
    pub listings_duplicate: u64,
    pub acceptance_rate: f64,
    pub per_platform_events: HashMap<String, u64>,
    pub per_platform_errors: HashMap<String, u64>,
    pub circuit_breaker_trips: u64,
    pub dedup_evictions: u64,
    pub uptime_seconds: u64,
    pub status: String,
}

struct PlatformCounters {
    events: AtomicU64,
    errors: AtomicU64,
}

impl PlatformCounters {
    fn new() -> Self {
        Self {
            events: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// Thread-safe atomic metrics collector.
pub struct MetricsCollector {
    cycles_completed: AtomicU64,
    listings_scanned: AtomicU64,
    listings_accepted: AtomicU64,
    listings_duplicate: AtomicU64,
    circuit_breaker_trips: AtomicU64,
    dedup_evictions: AtomicU64,
    per_platform: HashMap<Platform, PlatformCounters>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let per_platform = Platform::ALL.iter().map(|p| (*p, PlatformCounters::new())).collect();
        Self {
            cycles_completed: AtomicU64::new(0),
            listings_scanned: AtomicU64::new(0),
            listings_accepted: AtomicU64::new(0),
            listings_duplicate: AtomicU64::new(0),
            circuit_breaker_trips: AtomicU64::new(0),
            dedup_evictions: AtomicU64::new(0),
            per_platform,
            start_time: Instant::now(),
        }
    }

    pub fn increment_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scanned(&self, platform: Platform, count: u64) {
        self.listings_scanned.fetch_add(count, Ordering::Relaxed);
        if let Some(c) = self.per_platform.get(&platform) {
            c.events.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn increment_accepted(&self) {
        self.listings_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicate(&self) {
        self.listings_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_platform_error(&self, platform: Platform) {
        if let Some(c) = self.per_platform.get(&platform) {
            c.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Both circuit breaker trips and dedup evictions are already counted
    /// authoritatively elsewhere (`CircuitBreakerSnapshot::total_trips`,
    /// `DedupSnapshot::evictions`) — these just mirror the latest total so
    /// the metrics endpoint can report them without holding a reference to
    /// the registry or the dedup engine itself.
    pub fn set_circuit_breaker_trips(&self, total: u64) {
        self.circuit_breaker_trips.store(total, Ordering::Relaxed);
    }

    pub fn set_dedup_evictions(&self, total: u64) {
        self.dedup_evictions.store(total, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let scanned = self.listings_scanned.load(Ordering::Relaxed);
        let accepted = self.listings_accepted.load(Ordering::Relaxed);
        let acceptance_rate = if scanned > 0 {
            accepted as f64 / scanned as f64
        } else {
            0.0
        };

        let per_platform_events = self
            .per_platform
            .iter()
            .map(|(p, c)| (p.as_str().to_string(), c.events.load(Ordering::Relaxed)))
            .collect();
        let per_platform_errors = self
            .per_platform
            .iter()
            .map(|(p, c)| (p.as_str().to_string(), c.errors.load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            listings_scanned: scanned,
            listings_accepted: accepted,
            listings_duplicate: self.listings_duplicate.load(Ordering::Relaxed),
            acceptance_rate,
            per_platform_events,
            per_platform_errors,
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
            dedup_evictions: self.dedup_evictions.load(Ordering::Relaxed),
            uptime_seconds: uptime,
            status: "operational".to_string(),
        }
    }
}

/// Bare HTTP server on `port` serving the metrics snapshot as JSON — no
/// framework, same as the teacher's `run_metrics_server`.
pub async fn run_metrics_server(
    metrics: Arc<MetricsCollector>,
    port: u16,
    shutdown: &mut watch::Receiver<bool>,
) {
    use tokio::net::TcpListener;
    use tokio::io::AsyncWriteExt;

    let listener = match TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(l) => l,
        Err(e) => {
            error!(port, error = %e, "failed to bind metrics server");
            return;
        }
    };

    info!(port, "metrics server listening");

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((mut stream, _addr)) => {
                        let snapshot = metrics.snapshot();
                        let json = serde_json::to_string_pretty(&snapshot)
                            .unwrap_or_else(|_| "{}".to_string());

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\n\r\n{}",
                            json.len(),
                            json,
                        );

                        let _ = stream.write_all(response.as_bytes()).await;
                    }
                    Err(e) => {
                        error!(error = %e, "metrics server accept error");
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("metrics server shutting down");
                break;
            }
        }
    }
}
