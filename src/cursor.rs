// =============================================================================
// cursor.rs — THE CURSOR STORE
// =============================================================================
//
// Durable per-(platform, tier) offset table. The scheduler never decides on
// its own which keywords are "next" — it asks this store, which is the only
// source of truth for coverage across process restarts.
//
// Offset math verified against the original `keyword_state_manager.py`:
// `new_position = end_idx % total_keywords`, write-through JSON persistence,
// one entry per `{platform}:{tier}` key. Concurrent access is serialized with
// a single `parking_lot::Mutex` around the whole table, same discipline the
// teacher uses for its dedup/circuit-breaker shared state.
// =============================================================================

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{Keyword, Tier};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
struct CursorEntry {
    next_index: usize,
    completed_cycles: u64,
    #[serde(default)]
    last_run_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `(start_index, end_index, total, completed_cycles)` returned alongside
/// every batch, for logging and the supervisor's coverage reporting.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub start_index: usize,
    pub end_index: usize,
    pub total: usize,
    pub completed_cycles: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct CursorTable(HashMap<String, CursorEntry>);

/// Durable keyword-batch cursor (C2).
pub struct CursorStore {
    path: String,
    table: Mutex<CursorTable>,
}

fn key(platform: &str, tier: Tier) -> String {
    format!("{platform}:{tier}")
}

impl CursorStore {
    /// Load from `path`, or start empty on any read error — a read error
    /// falls back to "start from 0".
    pub fn load(path: &str) -> Self {
        let table = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        Self {
            path: path.to_string(),
            table: Mutex::new(table),
        }
    }

    /// Hand out the next batch of `batch_size` keywords for `(platform, tier)`
    /// out of `pool` (the tier's full keyword slice, in stable corpus order).
    ///
    /// Wraps when the slice runs past the end of the pool, incrementing
    /// `completed_cycles` on wrap. Persists write-through on every call.
    pub fn next_batch(
        &self,
        platform: &str,
        tier: Tier,
        batch_size: usize,
        pool: &[&Keyword],
    ) -> (Vec<Keyword>, BatchProgress) {
        let total = pool.len();
        if total == 0 || batch_size == 0 {
            return (
                vec![],
                BatchProgress {
                    start_index: 0,
                    end_index: 0,
                    total,
                    completed_cycles: 0,
                },
            );
        }

        let mut table = self.table.lock();
        let entry = table.0.entry(key(platform, tier)).or_default();
        let start_index = entry.next_index % total;

        let end_index = (start_index + batch_size).min(total);
        let mut batch: Vec<Keyword> = pool[start_index..end_index].iter().map(|k| (*k).clone()).collect();

        let mut wrapped = false;
        if batch.len() < batch_size && total >= batch_size {
            let remaining = batch_size - batch.len();
            wrapped = true;
            batch.extend(pool[0..remaining.min(total)].iter().map(|k| (*k).clone()));
        }

        let served = start_index + batch.len();
        entry.next_index = served % total;
        if wrapped || served >= total {
            entry.completed_cycles += 1;
        }
        entry.last_run_at = Some(chrono::Utc::now());

        let progress = BatchProgress {
            start_index,
            end_index,
            total,
            completed_cycles: entry.completed_cycles,
        };

        debug!(
            platform = platform,
            tier = %tier,
            start_index,
            end_index,
            next_index = entry.next_index,
            completed_cycles = entry.completed_cycles,
            "cursor advanced"
        );

        drop(table);
        self.persist();

        (batch, progress)
    }

    /// Write-through persistence. Logs and continues on failure — the next
    /// call retries.
    fn persist(&self) {
        let table = self.table.lock();
        match serde_json::to_string_pretty(&*table) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    warn!(path = %self.path, error = %e, "failed to persist cursor state");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize cursor state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<Keyword> {
        (0..n)
            .map(|i| Keyword {
                text: format!("term-{i}"),
                language: "en".to_string(),
                tier: Tier::General,
            })
            .collect()
    }

    #[test]
    fn cursor_advances_and_wraps_with_completed_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        let store = CursorStore::load(path.to_str().unwrap());
        let pool = pool(1000);
        let refs: Vec<&Keyword> = pool.iter().collect();

        let mut progress = None;
        for _ in 0..17 {
            let (_, p) = store.next_batch("ebay", Tier::General, 60, &refs);
            progress = Some(p);
        }

        let progress = progress.unwrap();
        assert_eq!(progress.completed_cycles, 1);

        let table = store.table.lock();
        let entry = table.0.get(&key("ebay", Tier::General)).unwrap();
        assert_eq!(entry.next_index, 20);
    }

    #[test]
    fn coverage_every_keyword_served_before_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        let store = CursorStore::load(path.to_str().unwrap());
        let pool = pool(100);
        let refs: Vec<&Keyword> = pool.iter().collect();

        let mut seen = std::collections::HashSet::new();
        let batches = (100f64 / 13f64).ceil() as usize;
        for _ in 0..batches {
            let (batch, _) = store.next_batch("craigslist", Tier::General, 13, &refs);
            for k in batch {
                seen.insert(k.text);
            }
        }
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn missing_file_starts_from_zero() {
        let store = CursorStore::load("/nonexistent/cursor.json");
        let pool = pool(10);
        let refs: Vec<&Keyword> = pool.iter().collect();
        let (batch, progress) = store.next_batch("ebay", Tier::Critical, 5, &refs);
        assert_eq!(progress.start_index, 0);
        assert_eq!(batch.len(), 5);
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        let pool = pool(10);
        let refs: Vec<&Keyword> = pool.iter().collect();

        {
            let store = CursorStore::load(path.to_str().unwrap());
            store.next_batch("ebay", Tier::Critical, 4, &refs);
        }

        let store = CursorStore::load(path.to_str().unwrap());
        let table = store.table.lock();
        let entry = table.0.get(&key("ebay", Tier::Critical)).unwrap();
        assert_eq!(entry.next_index, 4);
    }
}
