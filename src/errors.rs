// =============================================================================
// errors.rs — THE TAXONOMY OF THINGS THAT GO WRONG
// =============================================================================
//
// Most of what happens while scanning a dozen marketplaces is not exceptional
// at all: a site rate-limits you, a selector set comes up empty, a CAPTCHA
// shows up. Those get a named variant so the scheduler can react to them
// without string-matching a log line. The one thing that IS fatal is bad
// configuration at startup — there's no sensible way to run without a
// database or eBay credentials, so that's the only variant the supervisor
// ever propagates out of `main`.
// =============================================================================

use thiserror::Error;

/// Fatal startup configuration problems. The only error type `main` itself
/// ever returns — everything else is handled inside the cycle body.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingRequired(&'static str),

    #[error("keyword corpus file at {path} is missing and no fallback is available")]
    CorpusUnavailable { path: String },

    #[error("keyword corpus declares {declared} terms but only {loaded} loaded (below the 90% floor)")]
    CorpusBelowFloor { declared: usize, loaded: usize },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// The error taxonomy observable at the platform adapter layer.
/// None of these stop the scheduler — each is localized to one
/// (platform, cycle) and handled by the retry/backoff policy in `scheduler.rs`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterErrorKind {
    #[error("transport timeout")]
    TransportTimeout,

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("rate limited (HTTP 429 or adapter-specific signal)")]
    RateLimited,

    #[error("server error (HTTP >= 500)")]
    ServerError,

    #[error("parse yielded zero items")]
    ParseEmpty,

    #[error("bot challenge detected")]
    BotChallenge,

    #[error("permanent block signature (forbidden/access denied)")]
    PermanentBlock,
}

impl AdapterErrorKind {
    /// Permanent-block signatures abort the whole adapter call; no more
    /// retries happen for this cycle.
    pub fn is_permanent(&self) -> bool {
        matches!(self, AdapterErrorKind::PermanentBlock)
    }

    /// A bot challenge abandons the current term but isn't charged against
    /// the retry budget of other terms in the same batch.
    pub fn is_challenge(&self) -> bool {
        matches!(self, AdapterErrorKind::BotChallenge)
    }
}

/// Sink-layer outcomes. `DuplicateInsert` is explicitly not an error —
/// it's counted separately and the pipeline treats it as success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkErrorKind {
    #[error("duplicate listing_url, classified as non-error")]
    DuplicateInsert,

    #[error("database error: {0}")]
    DatabaseError(String),
}
