// =============================================================================
// corpus.rs — THE KEYWORD CORPUS
// =============================================================================
//
// Loaded once, read forever. The multilingual term list concatenates every
// language bucket in the source file's insertion order, drops case-
// insensitive duplicates keeping the first occurrence, and tags each
// surviving term with a tier drawn from the scorer's own indicator tables —
// a term scored `critical` by `scorer.rs` is a `critical` keyword here too,
// by construction, not by a second hand-maintained list.
//
// On a missing or truncated file this falls back to a small embedded
// critical-only set rather than refusing to start — the pipeline can run
// narrow, it just shouldn't refuse to run at all.
// =============================================================================

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::models::{Keyword, Tier};
use crate::scorer;

#[derive(Debug, Deserialize)]
struct CorpusFile {
    keywords_by_language: BTreeMap<String, Vec<String>>,
    total_keywords: usize,
    #[allow(dead_code)]
    total_languages: usize,
    #[allow(dead_code)]
    version: String,
}

/// A handful of unmistakably critical terms, embedded so the process can
/// still start (in a degraded, critical-only mode) if the corpus file is
/// missing entirely.
const FALLBACK_CRITICAL_TERMS: &[&str] = &[
    "ivory",
    "rhino horn",
    "tiger bone",
    "pangolin scale",
    "elephant tusk",
    "escort service",
    "outcall service",
];

/// Immutable, shared, read-only-after-load keyword set (C1).
#[derive(Debug)]
pub struct KeywordCorpus {
    all: Vec<Keyword>,
}

impl KeywordCorpus {
    /// Load from `path`. Fail-soft: a missing file or a file declaring far
    /// fewer terms than it loads falls back to the embedded critical set and
    /// logs a prominent warning rather than treating it as fatal — only a
    /// corpus that loads `< 90%` of its *own* declared total after
    /// successfully parsing is a `ConfigError`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                warn!(path = path, "keyword corpus file missing — falling back to embedded critical-only set");
                return Ok(Self::fallback());
            }
        };

        let parsed: CorpusFile = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = path, error = %e, "keyword corpus file malformed — falling back to embedded critical-only set");
                return Ok(Self::fallback());
            }
        };

        let mut seen = std::collections::HashSet::new();
        let mut all = Vec::new();
        for (language, terms) in &parsed.keywords_by_language {
            for term in terms {
                let key = term.trim().to_lowercase();
                if key.is_empty() || !seen.insert(key) {
                    continue;
                }
                let tier = scorer::tier_for_term(term);
                all.push(Keyword {
                    text: term.trim().to_string(),
                    language: language.clone(),
                    tier,
                });
            }
        }

        if parsed.total_keywords > 0 {
            let floor = (parsed.total_keywords as f64 * 0.9).ceil() as usize;
            if all.len() < floor {
                return Err(ConfigError::CorpusBelowFloor {
                    declared: parsed.total_keywords,
                    loaded: all.len(),
                });
            }
        }

        info!(
            path = path,
            loaded = all.len(),
            declared = parsed.total_keywords,
            languages = parsed.keywords_by_language.len(),
            "keyword corpus loaded"
        );

        Ok(Self { all })
    }

    fn fallback() -> Self {
        let all = FALLBACK_CRITICAL_TERMS
            .iter()
            .map(|t| Keyword {
                text: t.to_string(),
                language: "en".to_string(),
                tier: Tier::Critical,
            })
            .collect();
        Self { all }
    }

    pub fn get_all(&self) -> &[Keyword] {
        &self.all
    }

    pub fn get_by_tier(&self, tier: Tier) -> Vec<&Keyword> {
        self.all.iter().filter(|k| k.tier == tier).collect()
    }

    pub fn size(&self) -> usize {
        self.all.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_corpus_is_nonempty_and_critical() {
        let corpus = KeywordCorpus::fallback();
        assert!(corpus.size() > 0);
        assert_eq!(corpus.get_by_tier(Tier::Critical).len(), corpus.size());
    }

    #[test]
    fn missing_file_falls_back_instead_of_erroring() {
        let corpus = KeywordCorpus::load("/nonexistent/path/keywords.json").unwrap();
        assert!(corpus.size() > 0);
    }

    #[test]
    fn dedupes_case_insensitively_keeping_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(
            &path,
            r#"{
                "keywords_by_language": { "en": ["Ivory", "ivory", "IVORY "] },
                "total_keywords": 3,
                "total_languages": 1,
                "version": "test"
            }"#,
        )
        .unwrap();

        let corpus = KeywordCorpus::load(path.to_str().unwrap()).unwrap();
        assert_eq!(corpus.size(), 1);
        assert_eq!(corpus.get_all()[0].text, "Ivory");
    }
}
