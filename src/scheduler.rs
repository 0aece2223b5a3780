// =============================================================================
// scheduler.rs — THE SCHEDULER (C6)
// =============================================================================
//
// Decides, once per cycle: which platform, which keyword tier, which batch
// of terms, and how hard to retry before giving up. Everything it
// touches — the cursor store, the adapter registry, the circuit breakers —
// is handed in by the supervisor; the scheduler itself holds no cache state
// of its own beyond the weighted-draw table.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::{info, warn};

use crate::adapters::AdapterEntry;
use crate::config::Config;
use crate::corpus::KeywordCorpus;
use crate::cursor::{BatchProgress, CursorStore};
use crate::errors::AdapterErrorKind;
use crate::models::{Listing, Platform, Tier};

/// What one scheduled cycle produced.
pub struct CycleOutcome {
    pub platform: Platform,
    pub tier: Tier,
    pub listings: Vec<Listing>,
    pub progress: Option<BatchProgress>,
    pub error: Option<AdapterErrorKind>,
    pub attempts: u32,
}

impl CycleOutcome {
    fn skipped(platform: Platform, tier: Tier) -> Self {
        Self { platform, tier, listings: vec![], progress: None, error: None, attempts: 0 }
    }
}

/// Pick the keyword tier for a cycle index: every 3rd cycle critical, every
/// 4th high, otherwise general. Critical takes priority when a cycle index
/// satisfies both rules.
pub fn tier_for_cycle(cycle_index: u64) -> Tier {
    if cycle_index > 0 && cycle_index % 3 == 0 {
        Tier::Critical
    } else if cycle_index > 0 && cycle_index % 4 == 0 {
        Tier::High
    } else {
        Tier::General
    }
}

/// Adaptive inter-cycle delay: Facebook gets the longest cooldown,
/// a cycle that yielded a high-signal detection gets a short one, everything
/// else sits in the baseline band.
pub fn inter_cycle_delay(platform: Platform, yielded_high_signal: bool) -> Duration {
    let mut rng = rand::thread_rng();
    if platform == Platform::FacebookMarketplace {
        Duration::from_secs(rng.gen_range(60..=90))
    } else if yielded_high_signal {
        Duration::from_secs(rng.gen_range(20..=30))
    } else {
        Duration::from_secs(rng.gen_range(35..=45))
    }
}

pub struct Scheduler {
    config: Arc<Config>,
    corpus: Arc<KeywordCorpus>,
    cursor: Arc<CursorStore>,
    registry: Vec<AdapterEntry>,
    weights: WeightedIndex<u32>,
}

impl Scheduler {
    pub fn new(
        config: Arc<Config>,
        corpus: Arc<KeywordCorpus>,
        cursor: Arc<CursorStore>,
        registry: Vec<AdapterEntry>,
    ) -> Self {
        let weights = WeightedIndex::new(registry.iter().map(|e| e.weight))
            .expect("registry must be non-empty with positive weights");
        Self { config, corpus, cursor, registry, weights }
    }

    fn draw_platform_index(&self) -> usize {
        self.weights.sample(&mut rand::thread_rng())
    }

    /// Sum of `total_trips` across every platform's circuit breaker, for the
    /// metrics endpoint.
    pub fn total_circuit_breaker_trips(&self) -> u64 {
        self.registry.iter().map(|e| e.circuit_breaker.snapshot().total_trips).sum()
    }

    /// Run exactly one (platform, batch) pair end to end: draw a platform,
    /// pull its next keyword batch, scan with retry/backoff, and return
    /// whatever it produced. Never panics and never propagates an adapter
    /// error — everything localizes to this cycle.
    pub async fn run_cycle(&self, cycle_index: u64) -> CycleOutcome {
        let entry = &self.registry[self.draw_platform_index()];
        let platform = entry.adapter.platform();
        let tier = tier_for_cycle(cycle_index);

        let pool = self.corpus.get_by_tier(tier);
        if pool.is_empty() {
            warn!(%platform, %tier, "no keywords available for this tier, skipping cycle");
            return CycleOutcome::skipped(platform, tier);
        }

        let (keywords, progress) =
            self.cursor.next_batch(platform.as_str(), tier, self.config.batch_size, &pool);

        if keywords.is_empty() {
            return CycleOutcome::skipped(platform, tier);
        }

        let base_timeout = self.config.platform_timeouts.for_platform(platform.as_str());
        let mut attempt: u32 = 0;
        let mut listings = Vec::new();
        let mut last_error = None;

        loop {
            attempt += 1;

            if !entry.circuit_breaker.allow_request() {
                info!(%platform, "circuit breaker open, skipping this cycle's attempt");
                break;
            }

            let attempt_timeout = Duration::from_secs_f64(
                base_timeout.as_secs_f64() * self.config.retry_timeout_multiplier.powi(attempt as i32 - 1),
            );

            let scan_result = tokio::time::timeout(attempt_timeout, entry.adapter.scan(&keywords, attempt)).await;

            match scan_result {
                Ok((items, err)) => {
                    if !items.is_empty() {
                        entry.circuit_breaker.record_success();
                        listings = items;
                        last_error = None;
                        break;
                    }

                    match err {
                        Some(e) if e.is_permanent() => {
                            entry.circuit_breaker.record_failure();
                            warn!(%platform, attempt, "permanent block signature, aborting retries for this cycle");
                            last_error = Some(e);
                            break;
                        }
                        Some(e) if e.is_challenge() => {
                            // Abandoned, not charged against the retry budget.
                            info!(%platform, attempt, "bot challenge, abandoning this batch without penalty");
                            last_error = Some(e);
                            break;
                        }
                        Some(e) => {
                            entry.circuit_breaker.record_failure();
                            last_error = Some(e);
                        }
                        None => {
                            last_error = Some(AdapterErrorKind::ParseEmpty);
                        }
                    }
                }
                Err(_) => {
                    entry.circuit_breaker.record_failure();
                    last_error = Some(AdapterErrorKind::TransportTimeout);
                }
            }

            if attempt >= self.config.retry_budget {
                break;
            }

            let backoff = self
                .config
                .backoff_base
                .mul_f64(2f64.powi(attempt as i32 - 1))
                .min(self.config.backoff_cap);
            tokio::time::sleep(backoff).await;
        }

        CycleOutcome { platform, tier, listings, progress: Some(progress), error: last_error, attempts: attempt }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_schedule_prefers_critical_over_high_on_multiples_of_twelve() {
        assert_eq!(tier_for_cycle(3), Tier::Critical);
        assert_eq!(tier_for_cycle(4), Tier::High);
        assert_eq!(tier_for_cycle(12), Tier::Critical);
        assert_eq!(tier_for_cycle(5), Tier::General);
        assert_eq!(tier_for_cycle(0), Tier::General);
    }

    #[test]
    fn facebook_delay_is_always_in_its_own_band() {
        for _ in 0..20 {
            let d = inter_cycle_delay(Platform::FacebookMarketplace, true);
            assert!(d.as_secs() >= 60 && d.as_secs() <= 90);
        }
    }

    #[test]
    fn high_yield_delay_is_shorter_than_baseline() {
        for _ in 0..20 {
            let d = inter_cycle_delay(Platform::Ebay, true);
            assert!(d.as_secs() >= 20 && d.as_secs() <= 30);
            let d = inter_cycle_delay(Platform::Ebay, false);
            assert!(d.as_secs() >= 35 && d.as_secs() <= 45);
        }
    }
}
