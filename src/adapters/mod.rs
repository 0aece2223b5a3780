// =============================================================================
// adapters/ — THE PLATFORM ADAPTER LAYER
// =============================================================================
//
// One adapter per marketplace behind a single trait contract, plugin-like
// registry. Three transport strategies share the same shape:
//
//   - `ebay`: authenticated JSON API (OAuth2 client-credentials, Browse API)
//   - `http_adapter`: plain HTTP + HTML, ordered selector-set extraction
//   - `headless`: WebDriver-backed browser automation with anti-bot posture
//
// Adding a twelfth marketplace means writing one more file that builds a
// `HttpAdapter`/`HeadlessAdapter`/bespoke struct and registering it — nothing
// else in the pipeline changes.
// =============================================================================

pub mod common;
pub mod headless;
pub mod http_adapter;

mod avito;
mod craigslist;
mod ebay;
mod facebook_marketplace;
mod gumtree;
mod mercadolibre;
mod marktplaats;
mod mercari;
mod olx;
mod aliexpress;
mod taobao;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::Config;
use crate::errors::AdapterErrorKind;
use crate::models::{Keyword, Listing, Platform};

/// The contract every marketplace adapter implements.
///
/// `attempt_no` is threaded through from the scheduler's retry loop so an
/// adapter can rotate regions/identities deterministically across retries of
/// the same batch, without keeping any state of its own between calls.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn scan(&self, keywords: &[Keyword], attempt_no: u32) -> (Vec<Listing>, Option<AdapterErrorKind>);
}

/// One adapter's registration: its weight in the scheduler's weighted draw,
/// and the circuit breaker that gates its requests.
pub struct AdapterEntry {
    pub adapter: Arc<dyn PlatformAdapter>,
    pub weight: u32,
    pub circuit_breaker: Arc<CircuitBreaker>,
}

/// Build the full roster of platform adapters plus their scheduler weights —
/// weighted-random platform draw favoring Avito 4 / eBay 3 / Craigslist 3 /
/// others 1-2.
pub fn build_registry(config: &Config, client: Client) -> Vec<AdapterEntry> {
    let breaker_for = |name: &str| {
        Arc::new(CircuitBreaker::new(
            name,
            config.circuit_breaker_failure_threshold,
            config.circuit_breaker_reset_timeout,
            config.circuit_breaker_success_threshold,
        ))
    };

    vec![
        AdapterEntry {
            adapter: Arc::new(ebay::EbayAdapter::new(client.clone(), config.ebay_app_id.clone(), config.ebay_cert_id.clone())),
            weight: 3,
            circuit_breaker: breaker_for("ebay"),
        },
        AdapterEntry {
            adapter: Arc::new(craigslist::adapter(client.clone())),
            weight: 3,
            circuit_breaker: breaker_for("craigslist"),
        },
        AdapterEntry {
            adapter: Arc::new(olx::adapter(client.clone())),
            weight: 2,
            circuit_breaker: breaker_for("olx"),
        },
        AdapterEntry {
            adapter: Arc::new(marktplaats::adapter(client.clone())),
            weight: 1,
            circuit_breaker: breaker_for("marktplaats"),
        },
        AdapterEntry {
            adapter: Arc::new(mercadolibre::adapter(client.clone())),
            weight: 2,
            circuit_breaker: breaker_for("mercadolibre"),
        },
        AdapterEntry {
            adapter: Arc::new(aliexpress::adapter(config.webdriver_url.clone())),
            weight: 1,
            circuit_breaker: breaker_for("aliexpress"),
        },
        AdapterEntry {
            adapter: Arc::new(taobao::adapter(config.webdriver_url.clone())),
            weight: 1,
            circuit_breaker: breaker_for("taobao"),
        },
        AdapterEntry {
            adapter: Arc::new(mercari::adapter(client.clone())),
            weight: 1,
            circuit_breaker: breaker_for("mercari"),
        },
        AdapterEntry {
            adapter: Arc::new(gumtree::adapter(client.clone())),
            weight: 2,
            circuit_breaker: breaker_for("gumtree"),
        },
        AdapterEntry {
            adapter: Arc::new(avito::adapter(client)),
            weight: 4,
            circuit_breaker: breaker_for("avito"),
        },
        AdapterEntry {
            adapter: Arc::new(facebook_marketplace::adapter(config.webdriver_url.clone())),
            weight: 1,
            circuit_breaker: breaker_for("facebook_marketplace"),
        },
    ]
}
