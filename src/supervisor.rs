// =============================================================================
// supervisor.rs — THE SUPERVISOR (C8)
// =============================================================================
//
// Owns every piece of cross-cycle state the scheduler itself is forbidden to
// hold: the dedup cache, the sink, the metrics collector, and the session
// totals that become the exit-time report. The loop body is
// the single-threaded cooperative core the concurrency model describes: one
// cycle runs to completion — draw, scan, score, sink — then the supervisor
// sleeps an adaptive delay before the next one. Adapters may fan requests
// out internally; nothing here runs two cycles at once.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::dedup::DedupEngine;
use crate::metrics::MetricsCollector;
use crate::models::{Detection, ThreatLevel};
use crate::scheduler::{self, Scheduler};
use crate::scorer;
use crate::sink::Sink;

pub struct Supervisor {
    config: Arc<Config>,
    run_tag: String,
    scheduler: Scheduler,
    dedup: Arc<DedupEngine>,
    sink: Arc<Sink>,
    metrics: Arc<MetricsCollector>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub run_tag: String,
    pub duration_secs: u64,
    pub cycles_completed: u64,
    pub total_scanned: u64,
    pub total_accepted: u64,
    pub total_duplicates: u64,
    pub acceptance_rate: f64,
    pub per_platform_accepted: HashMap<String, u64>,
    pub per_threat_level: HashMap<String, u64>,
    pub top_rejection_reasons: Vec<(String, u64)>,
    pub projected_hourly_detections: f64,
    pub projected_daily_detections: f64,
}

impl Supervisor {
    pub fn new(
        config: Arc<Config>,
        run_tag: String,
        scheduler: Scheduler,
        dedup: Arc<DedupEngine>,
        sink: Arc<Sink>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { config, run_tag, scheduler, dedup, sink, metrics }
    }

    /// Run cycles until the scan duration budget elapses or shutdown is
    /// signalled, then return the session report.
    pub async fn run(&self, shutdown: &mut watch::Receiver<bool>) -> SessionReport {
        let start = Instant::now();
        let mut cycle_index: u64 = 0;

        let mut total_scanned: u64 = 0;
        let mut total_accepted: u64 = 0;
        let mut total_duplicates: u64 = 0;
        let mut per_platform_accepted: HashMap<String, u64> = HashMap::new();
        let mut per_threat_level: HashMap<String, u64> = HashMap::new();
        let mut rejection_reasons: HashMap<String, u64> = HashMap::new();

        loop {
            if *shutdown.borrow() {
                info!("shutdown signalled, ending session");
                break;
            }
            if start.elapsed() >= self.config.scan_duration {
                info!(elapsed_secs = start.elapsed().as_secs(), "scan duration budget exhausted");
                break;
            }

            let outcome = self.scheduler.run_cycle(cycle_index).await;
            self.metrics.increment_cycle();
            self.metrics.increment_scanned(outcome.platform, outcome.listings.len() as u64);
            total_scanned += outcome.listings.len() as u64;

            if let Some(err) = &outcome.error {
                self.metrics.increment_platform_error(outcome.platform);
                if !err.is_challenge() {
                    *rejection_reasons.entry(format!("adapter error: {err}")).or_insert(0) += 1;
                }
            }

            let mut cycle_yielded_high_signal = false;

            for listing in &outcome.listings {
                if !self.dedup.observe(&listing.url, &listing.title) {
                    self.metrics.increment_duplicate();
                    total_duplicates += 1;
                    continue;
                }

                let assessment = scorer::score(listing, &listing.search_term, outcome.platform.as_str());
                *per_threat_level.entry(assessment.level.to_string()).or_insert(0) += 1;

                if assessment.level == ThreatLevel::Safe {
                    *rejection_reasons.entry("scored below threshold".to_string()).or_insert(0) += 1;
                    continue;
                }

                let detection = Detection::new(&self.run_tag, listing, &assessment);
                match self.sink.insert(&detection).await {
                    Ok(()) => {
                        self.metrics.increment_accepted();
                        total_accepted += 1;
                        *per_platform_accepted.entry(outcome.platform.as_str().to_string()).or_insert(0) += 1;
                        if assessment.level >= ThreatLevel::High {
                            cycle_yielded_high_signal = true;
                        }
                    }
                    Err(e) => {
                        warn!(evidence_id = %detection.evidence_id, error = %e, "sink insert failed, row lost for this cycle");
                        *rejection_reasons.entry("sink error".to_string()).or_insert(0) += 1;
                    }
                }
            }

            self.metrics.set_dedup_evictions(self.dedup.snapshot().evictions);
            self.metrics.set_circuit_breaker_trips(self.scheduler.total_circuit_breaker_trips());

            if cycle_index % self.config.dedup_snapshot_every_cycles == 0 {
                self.dedup.snapshot_to_disk(&self.config.dedup_snapshot_path);
            }

            cycle_index += 1;

            let delay = scheduler::inter_cycle_delay(outcome.platform, cycle_yielded_high_signal);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("shutdown signalled during inter-cycle delay");
                }
            }
        }

        self.dedup.snapshot_to_disk(&self.config.dedup_snapshot_path);

        let elapsed = start.elapsed();
        let elapsed_hours = (elapsed.as_secs_f64() / 3600.0).max(1.0 / 3600.0);
        let projected_hourly = total_accepted as f64 / elapsed_hours;

        let mut top_rejection_reasons: Vec<(String, u64)> = rejection_reasons.into_iter().collect();
        top_rejection_reasons.sort_by(|a, b| b.1.cmp(&a.1));
        top_rejection_reasons.truncate(10);

        let report = SessionReport {
            run_tag: self.run_tag.clone(),
            duration_secs: elapsed.as_secs(),
            cycles_completed: cycle_index,
            total_scanned,
            total_accepted,
            total_duplicates,
            acceptance_rate: if total_scanned > 0 { total_accepted as f64 / total_scanned as f64 } else { 0.0 },
            per_platform_accepted,
            per_threat_level,
            top_rejection_reasons,
            projected_hourly_detections: projected_hourly,
            projected_daily_detections: projected_hourly * 24.0,
        };

        if let Ok(json) = serde_json::to_string_pretty(&report) {
            if let Err(e) = std::fs::write(&self.config.session_stats_path, json) {
                warn!(path = %self.config.session_stats_path, error = %e, "failed to persist session report");
            }
        }

        report
    }
}
