// =============================================================================
// dedup.rs — THE DEDUPLICATION CACHE
// =============================================================================
//
// Two in-memory sets: `seen_urls` (normalized URL strings) and `seen_titles`
// (a hash of the lowercased, whitespace-collapsed title). `observe(listing)`
// records both as a side effect and returns whether the listing was novel.
//
// The database's unique constraint on `listing_url` is the authoritative
// dedup layer — this cache only saves a round trip. That's why
// eviction here is allowed to be lossy: when `seen_urls` exceeds
// `HIGH_WATERMARK`, a random sample of `LOW_WATERMARK` entries survives and
// the rest are simply forgotten, same as the original
// `continuous_deduplication_scanner.py`'s `seen_urls`/`seen_titles` pair.
//
// Kept from the teacher's `dedup.rs`: the `parking_lot::RwLock` + atomic
// stats struct + `snapshot()`-for-metrics idiom, and the
// `#[cfg(test)] mod tests` style below it.
// =============================================================================

use parking_lot::RwLock;
use portable_atomic::{AtomicU64, Ordering};
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

const TRACKING_PARAM_PREFIXES: &[&str] = &["utm_"];
const TRACKING_PARAM_EXACT: &[&str] = &["fbclid", "ref", "source"];

/// Normalize a URL for dedup purposes: lowercase scheme/host/path, strip a
/// trailing slash, and drop known tracking query parameters.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.trim().to_lowercase();
    };

    let kept_pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let k = k.to_lowercase();
            !TRACKING_PARAM_PREFIXES.iter().any(|p| k.starts_with(p))
                && !TRACKING_PARAM_EXACT.contains(&k.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept_pairs.is_empty() {
        url.set_query(None);
    } else {
        let query = kept_pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    let scheme = url.scheme().to_lowercase();
    let host = url.host_str().unwrap_or("").to_lowercase();
    let mut path = url.path().to_lowercase();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    match url.query() {
        Some(q) => format!("{scheme}://{host}{path}?{q}"),
        None => format!("{scheme}://{host}{path}"),
    }
}

/// Hash a normalized title: lowercased, whitespace-collapsed.
fn title_hash(title: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let normalized: String = title.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    normalized.hash(&mut hasher);
    hasher.finish()
}

pub struct DedupStats {
    pub checks: AtomicU64,
    pub unique: AtomicU64,
    pub duplicates: AtomicU64,
    pub evictions: AtomicU64,
}

impl DedupStats {
    fn new() -> Self {
        Self {
            checks: AtomicU64::new(0),
            unique: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct DedupState {
    seen_urls: HashSet<String>,
    #[serde(default)]
    seen_titles: HashSet<u64>,
}

/// In-memory, bounded dedup cache (C3).
pub struct DedupEngine {
    state: RwLock<DedupState>,
    high_watermark: usize,
    low_watermark: usize,
    pub stats: DedupStats,
}

impl DedupEngine {
    pub fn new(high_watermark: usize, low_watermark: usize) -> Self {
        info!(high_watermark, low_watermark, "dedup cache initialized");
        Self {
            state: RwLock::new(DedupState::default()),
            high_watermark,
            low_watermark,
            stats: DedupStats::new(),
        }
    }

    /// Best-effort load from a disk snapshot. Missing or malformed
    /// files leave the cache empty rather than failing startup.
    pub fn load(high_watermark: usize, low_watermark: usize, path: &str) -> Self {
        let engine = Self::new(high_watermark, low_watermark);
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<DedupState>(&raw) {
                Ok(loaded) => {
                    info!(
                        path,
                        urls = loaded.seen_urls.len(),
                        titles = loaded.seen_titles.len(),
                        "dedup cache snapshot loaded"
                    );
                    *engine.state.write() = loaded;
                }
                Err(e) => warn!(path, error = %e, "dedup snapshot malformed — starting empty"),
            },
            Err(_) => debug!(path, "no dedup snapshot on disk — starting empty"),
        }
        engine
    }

    /// Returns true iff `listing` is novel, recording its URL and title hash
    /// as a side effect either way is observed only once per URL.
    pub fn observe(&self, url: &str, title: &str) -> bool {
        self.stats.checks.fetch_add(1, Ordering::Relaxed);

        let normalized_url = normalize_url(url);
        let thash = title_hash(title);

        {
            let state = self.state.read();
            if state.seen_urls.contains(&normalized_url) {
                self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        }

        let mut state = self.state.write();
        if state.seen_urls.contains(&normalized_url) {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        state.seen_urls.insert(normalized_url);
        state.seen_titles.insert(thash);
        self.stats.unique.fetch_add(1, Ordering::Relaxed);

        if state.seen_urls.len() > self.high_watermark {
            self.evict_locked(&mut state);
        }

        true
    }

    fn evict_locked(&self, state: &mut DedupState) {
        let mut rng = rand::thread_rng();
        let kept: HashSet<String> = state
            .seen_urls
            .iter()
            .cloned()
            .choose_multiple(&mut rng, self.low_watermark)
            .into_iter()
            .collect();
        let evicted = state.seen_urls.len() - kept.len();
        state.seen_urls = kept;
        // Title hashes aren't keyed to URLs 1:1 here, so we simply cap the
        // set at the same watermark rather than trying to track pairs.
        if state.seen_titles.len() > self.high_watermark {
            let kept_titles: HashSet<u64> = state
                .seen_titles
                .iter()
                .copied()
                .choose_multiple(&mut rng, self.low_watermark)
                .into_iter()
                .collect();
            state.seen_titles = kept_titles;
        }

        self.stats.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        info!(evicted, remaining = state.seen_urls.len(), "dedup cache evicted down to low watermark");
    }

    /// Flush the current URL/title sets to `path`.
    pub fn snapshot_to_disk(&self, path: &str) {
        let state = self.state.read();
        match serde_json::to_string(&*state) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(path, raw) {
                    warn!(path, error = %e, "failed to write dedup snapshot");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize dedup snapshot"),
        }
    }

    pub fn snapshot(&self) -> DedupSnapshot {
        let state = self.state.read();
        DedupSnapshot {
            total_checks: self.stats.checks.load(Ordering::Relaxed),
            unique_items: self.stats.unique.load(Ordering::Relaxed),
            duplicates_caught: self.stats.duplicates.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            url_cache_size: state.seen_urls.len(),
            title_cache_size: state.seen_titles.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DedupSnapshot {
    pub total_checks: u64,
    pub unique_items: u64,
    pub duplicates_caught: u64,
    pub evictions: u64,
    pub url_cache_size: usize,
    pub title_cache_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_listing_is_observed_once() {
        let engine = DedupEngine::new(150_000, 100_000);
        assert!(engine.observe("https://example.com/item/1", "Antique ivory carving"));
        assert!(!engine.observe("https://example.com/item/1", "Antique ivory carving"));
    }

    #[test]
    fn different_urls_are_both_novel() {
        let engine = DedupEngine::new(150_000, 100_000);
        assert!(engine.observe("https://example.com/item/1", "A"));
        assert!(engine.observe("https://example.com/item/2", "B"));
    }

    #[test]
    fn url_normalization_strips_tracking_params() {
        let base = normalize_url("https://Example.com/Item/1?utm_source=x&ref=y");
        let tracked = normalize_url("https://example.com/item/1/");
        assert_eq!(base, tracked);
    }

    #[test]
    fn normalization_is_idempotent_across_tracking_param_additions() {
        let plain = normalize_url("https://example.com/item/1");
        let with_fbclid = normalize_url("https://example.com/item/1?fbclid=abc123");
        assert_eq!(plain, with_fbclid);
    }

    #[test]
    fn eviction_keeps_cache_under_high_watermark() {
        let engine = DedupEngine::new(50, 20);
        for i in 0..100 {
            engine.observe(&format!("https://example.com/item/{i}"), "title");
        }
        let snap = engine.snapshot();
        assert!(snap.url_cache_size <= 50);
        assert!(snap.evictions > 0);
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let engine = DedupEngine::new(150_000, 100_000);
        engine.observe("https://example.com/item/1", "title");
        engine.snapshot_to_disk(path.to_str().unwrap());

        let reloaded = DedupEngine::load(150_000, 100_000, path.to_str().unwrap());
        assert!(!reloaded.observe("https://example.com/item/1", "title"));
    }
}
