// =============================================================================
// config.rs — THE GRAND CONFIGURATION CATHEDRAL
// =============================================================================
//
// Every tunable in the pipeline lives here: platform timeouts, retry budget,
// backoff base, dedup watermarks, batch size, the tier-rotation schedule, the
// scan duration budget, the metrics port, and the keyword-corpus/state file
// paths. All of it loads from the environment with a typed default, the way
// the original `Config::from_env` did — except the two genuinely required
// settings (database credentials, eBay OAuth credentials) are fatal if
// missing instead of silently defaulting to something that would just fail
// later and less informatively.
// =============================================================================

use std::env;
use std::time::Duration;

use crate::errors::ConfigError;

/// Per-platform hard timeout, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct PlatformTimeouts {
    pub ebay: u64,
    pub craigslist: u64,
    pub olx: u64,
    pub marktplaats: u64,
    pub mercadolibre: u64,
    pub aliexpress: u64,
    pub taobao: u64,
    pub mercari: u64,
    pub gumtree: u64,
    pub avito: u64,
    pub facebook_marketplace: u64,
}

impl PlatformTimeouts {
    fn from_env() -> Self {
        Self {
            ebay: env_or_default("WILDGUARD_TIMEOUT_EBAY_SECS", "50").parse().unwrap_or(50),
            craigslist: env_or_default("WILDGUARD_TIMEOUT_CRAIGSLIST_SECS", "120").parse().unwrap_or(120),
            olx: env_or_default("WILDGUARD_TIMEOUT_OLX_SECS", "80").parse().unwrap_or(80),
            marktplaats: env_or_default("WILDGUARD_TIMEOUT_MARKTPLAATS_SECS", "100").parse().unwrap_or(100),
            mercadolibre: env_or_default("WILDGUARD_TIMEOUT_MERCADOLIBRE_SECS", "150").parse().unwrap_or(150),
            aliexpress: env_or_default("WILDGUARD_TIMEOUT_ALIEXPRESS_SECS", "120").parse().unwrap_or(120),
            taobao: env_or_default("WILDGUARD_TIMEOUT_TAOBAO_SECS", "180").parse().unwrap_or(180),
            mercari: env_or_default("WILDGUARD_TIMEOUT_MERCARI_SECS", "70").parse().unwrap_or(70),
            gumtree: env_or_default("WILDGUARD_TIMEOUT_GUMTREE_SECS", "90").parse().unwrap_or(90),
            avito: env_or_default("WILDGUARD_TIMEOUT_AVITO_SECS", "90").parse().unwrap_or(90),
            facebook_marketplace: env_or_default("WILDGUARD_TIMEOUT_FACEBOOK_SECS", "90").parse().unwrap_or(90),
        }
    }

    /// Hard timeout for a platform by its registry name. Falls back to a
    /// conservative 90s for any name the table doesn't recognize (should
    /// never happen outside of a typo in the adapter registry).
    pub fn for_platform(&self, platform: &str) -> Duration {
        let secs = match platform {
            "ebay" => self.ebay,
            "craigslist" => self.craigslist,
            "olx" => self.olx,
            "marktplaats" => self.marktplaats,
            "mercadolibre" => self.mercadolibre,
            "aliexpress" => self.aliexpress,
            "taobao" => self.taobao,
            "mercari" => self.mercari,
            "gumtree" => self.gumtree,
            "avito" => self.avito,
            "facebook_marketplace" => self.facebook_marketplace,
            _ => 90,
        };
        Duration::from_secs(secs)
    }
}

/// The Grand Configuration Struct. Every tunable parameter in the entire
/// engine lives here.
#[derive(Debug, Clone)]
pub struct Config {
    // === REQUIRED — FATAL IF MISSING === //
    /// Base URL of the detections REST endpoint.
    pub database_url: String,
    /// API key/bearer token for the detections endpoint.
    pub database_api_key: String,
    /// eBay Browse API application (client) id.
    pub ebay_app_id: String,
    /// eBay Browse API certificate (client secret) id.
    pub ebay_cert_id: String,

    // === PLATFORM TIMEOUTS === //
    pub platform_timeouts: PlatformTimeouts,

    // === RETRY & BACKOFF === //
    /// R in `min(base * 2^(n-1), 45s)`.
    pub retry_budget: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Multiplier applied to the platform's hard timeout on each retry attempt.
    pub retry_timeout_multiplier: f64,

    // === DEDUP CACHE === //
    pub dedup_high_watermark: usize,
    pub dedup_low_watermark: usize,
    /// How many cycles between dedup cache disk snapshots.
    pub dedup_snapshot_every_cycles: u64,

    // === SCHEDULER === //
    /// Typical keyword batch size, 12-50.
    pub batch_size: usize,
    pub scan_duration: Duration,
    pub enable_historical_backfill: bool,
    pub historical_days: u32,

    // === CIRCUIT BREAKER (shared defaults across adapters) === //
    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_reset_timeout: Duration,
    pub circuit_breaker_success_threshold: u32,

    // === METRICS SERVER === //
    pub metrics_port: u16,

    // === HEADLESS BROWSER ADAPTERS === //
    /// WebDriver endpoint the headless-strategy adapters (AliExpress, Taobao,
    /// Facebook Marketplace) connect to.
    pub webdriver_url: String,

    // === STATE FILES === //
    pub keyword_corpus_path: String,
    pub cursor_state_path: String,
    pub dedup_snapshot_path: String,
    pub session_stats_path: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    /// Every parameter can be overridden via environment variables prefixed
    /// with WILDGUARD_. Required variables missing at startup are a fatal
    /// `ConfigError`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = required_env("WILDGUARD_DATABASE_URL")?;
        let database_api_key = required_env("WILDGUARD_DATABASE_API_KEY")?;
        let ebay_app_id = required_env("WILDGUARD_EBAY_APP_ID")?;
        let ebay_cert_id = required_env("WILDGUARD_EBAY_CERT_ID")?;

        Ok(Config {
            database_url,
            database_api_key,
            ebay_app_id,
            ebay_cert_id,

            platform_timeouts: PlatformTimeouts::from_env(),

            retry_budget: env_or_default("WILDGUARD_RETRY_BUDGET", "4").parse().unwrap_or(4),
            backoff_base: Duration::from_secs(
                env_or_default("WILDGUARD_BACKOFF_BASE_SECS", "2").parse().unwrap_or(2),
            ),
            backoff_cap: Duration::from_secs(
                env_or_default("WILDGUARD_BACKOFF_CAP_SECS", "45").parse().unwrap_or(45),
            ),
            retry_timeout_multiplier: env_or_default("WILDGUARD_RETRY_TIMEOUT_MULTIPLIER", "1.8")
                .parse()
                .unwrap_or(1.8),

            dedup_high_watermark: env_or_default("WILDGUARD_DEDUP_HIGH_WATERMARK", "150000")
                .parse()
                .unwrap_or(150_000),
            dedup_low_watermark: env_or_default("WILDGUARD_DEDUP_LOW_WATERMARK", "100000")
                .parse()
                .unwrap_or(100_000),
            dedup_snapshot_every_cycles: env_or_default("WILDGUARD_DEDUP_SNAPSHOT_EVERY_CYCLES", "10")
                .parse()
                .unwrap_or(10),

            batch_size: env_or_default("BATCH_SIZE", "20").parse().unwrap_or(20),
            scan_duration: Duration::from_secs(
                env_or_default("SCAN_DURATION", "24").parse::<u64>().unwrap_or(24) * 3600,
            ),
            enable_historical_backfill: env_or_default("ENABLE_HISTORICAL_BACKFILL", "false")
                .parse()
                .unwrap_or(false),
            historical_days: env_or_default("HISTORICAL_DAYS", "30").parse().unwrap_or(30),

            circuit_breaker_failure_threshold: env_or_default("WILDGUARD_CB_FAILURE_THRESHOLD", "5")
                .parse()
                .unwrap_or(5),
            circuit_breaker_reset_timeout: Duration::from_secs(
                env_or_default("WILDGUARD_CB_RESET_TIMEOUT_SECS", "60").parse().unwrap_or(60),
            ),
            circuit_breaker_success_threshold: env_or_default("WILDGUARD_CB_SUCCESS_THRESHOLD", "2")
                .parse()
                .unwrap_or(2),

            metrics_port: env_or_default("WILDGUARD_METRICS_PORT", "9090").parse().unwrap_or(9090),

            webdriver_url: env_or_default("WILDGUARD_WEBDRIVER_URL", "http://localhost:4444"),

            keyword_corpus_path: env_or_default("WILDGUARD_KEYWORD_CORPUS_PATH", "data/keywords.json"),
            cursor_state_path: env_or_default("WILDGUARD_CURSOR_STATE_PATH", "/tmp/wildguard_keyword_state.json"),
            dedup_snapshot_path: env_or_default("WILDGUARD_DEDUP_SNAPSHOT_PATH", "/tmp/wildguard_url_cache.json"),
            session_stats_path: env_or_default("WILDGUARD_SESSION_STATS_PATH", "/tmp/wildguard_session_stats.json"),
        })
    }
}

/// Helper function to read an environment variable with a default fallback.
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to read a required environment variable, failing fatally if absent
/// or empty.
fn required_env(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingRequired(key)),
    }
}
