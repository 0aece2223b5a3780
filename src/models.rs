// =============================================================================
// models.rs — THE DATA STRUCTURES OF THE SURVEILLANCE PIPELINE
// =============================================================================
//
// Keyword, Listing, ThreatAssessment, Detection: one record shape per stage
// of the pipeline. Everything downstream of the Platform Adapter reads
// and writes these — nothing else.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority bucket over keywords.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Critical,
    High,
    Medium,
    General,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Critical => write!(f, "critical"),
            Tier::High => write!(f, "high"),
            Tier::Medium => write!(f, "medium"),
            Tier::General => write!(f, "general"),
        }
    }
}

/// A single keyword term, tagged at corpus-load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub language: String,
    pub tier: Tier,
}

/// The marketplaces this pipeline watches. One variant per platform adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ebay,
    Craigslist,
    Olx,
    Marktplaats,
    MercadoLibre,
    AliExpress,
    Taobao,
    Mercari,
    Gumtree,
    Avito,
    FacebookMarketplace,
}

impl Platform {
    /// All platforms, in registry order. Used by the scheduler's weighted
    /// draw and by anything that needs to iterate the whole roster.
    pub const ALL: [Platform; 11] = [
        Platform::Ebay,
        Platform::Craigslist,
        Platform::Olx,
        Platform::Marktplaats,
        Platform::MercadoLibre,
        Platform::AliExpress,
        Platform::Taobao,
        Platform::Mercari,
        Platform::Gumtree,
        Platform::Avito,
        Platform::FacebookMarketplace,
    ];

    /// Lowercase, snake_case registry name — used as the cursor store key,
    /// the circuit breaker name, and the per-platform log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ebay => "ebay",
            Platform::Craigslist => "craigslist",
            Platform::Olx => "olx",
            Platform::Marktplaats => "marktplaats",
            Platform::MercadoLibre => "mercadolibre",
            Platform::AliExpress => "aliexpress",
            Platform::Taobao => "taobao",
            Platform::Mercari => "mercari",
            Platform::Gumtree => "gumtree",
            Platform::Avito => "avito",
            Platform::FacebookMarketplace => "facebook_marketplace",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized listing, as returned by a Platform Adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub platform: Platform,
    pub search_term: String,
    pub title: String,
    pub description: Option<String>,
    pub price_text: Option<String>,
    pub url: String,
    pub native_item_id: Option<String>,
    pub location: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// Threat level bucket, thresholded on `score`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreatLevel::Safe => "SAFE",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Primary threat category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatCategory {
    Safe,
    Wildlife,
    HumanTrafficking,
    Both,
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreatCategory::Safe => "SAFE",
            ThreatCategory::Wildlife => "WILDLIFE",
            ThreatCategory::HumanTrafficking => "HUMAN_TRAFFICKING",
            ThreatCategory::Both => "BOTH",
        };
        write!(f, "{s}")
    }
}

/// The pure output of the Threat Scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub score: u32,
    pub level: ThreatLevel,
    pub category: ThreatCategory,
    pub confidence: f64,
    pub false_positive_risk: f64,
    pub requires_human_review: bool,
    pub wildlife_indicators: Vec<String>,
    pub ht_indicators: Vec<String>,
    pub reasoning: String,
}

/// A persisted row recording a scored listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub evidence_id: String,
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
    pub platform: Platform,
    pub threat_score: u32,
    pub threat_level: ThreatLevel,
    pub threat_category: ThreatCategory,
    pub species_involved: String,
    pub alert_sent: bool,
    pub listing_title: String,
    pub listing_url: String,
    pub listing_price: Option<String>,
    pub search_term: String,
    pub description: Option<String>,
    pub confidence_score: f64,
    pub requires_human_review: bool,
    pub status: String,
}

impl Detection {
    /// Build a Detection row from a scored listing, minting the evidence id
    /// as `{RUN_TAG}-{PLATFORM}-{YYYYMMDD-HHMMSS}-{item_key}`.
    pub fn new(run_tag: &str, listing: &Listing, assessment: &ThreatAssessment) -> Self {
        let observed_at = listing.observed_at;
        let item_key = listing
            .native_item_id
            .clone()
            .unwrap_or_else(|| short_hash(&listing.url));

        let evidence_id = format!(
            "{}-{}-{}-{}",
            run_tag,
            listing.platform.as_str().to_uppercase(),
            observed_at.format("%Y%m%d-%H%M%S"),
            item_key,
        );

        // Truncate to the schema's documented bounds.
        let listing_title: String = listing.title.chars().take(500).collect();
        let description = listing
            .description
            .as_ref()
            .map(|d| d.chars().take(1000).collect());

        Self {
            evidence_id,
            observed_at,
            platform: listing.platform,
            threat_score: assessment.score,
            threat_level: assessment.level,
            threat_category: assessment.category,
            species_involved: format!("Keywords: {}", listing.search_term),
            alert_sent: matches!(assessment.level, ThreatLevel::Critical | ThreatLevel::High),
            listing_title,
            listing_url: listing.url.clone(),
            listing_price: listing.price_text.clone(),
            search_term: listing.search_term.clone(),
            description,
            confidence_score: assessment.confidence,
            requires_human_review: assessment.requires_human_review,
            status: "new".to_string(),
        }
    }
}

/// Short, stable, non-cryptographic fingerprint used as a fallback item key
/// when an adapter doesn't expose a native item id.
fn short_hash(s: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
