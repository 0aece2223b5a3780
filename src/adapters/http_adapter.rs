// =============================================================================
// adapters/http_adapter.rs — PLAIN HTTP + HTML ADAPTER
// =============================================================================
//
// Shared implementation for the marketplaces that serve server-rendered HTML
// and don't gate search behind a JS challenge by default: Avito, Marktplaats,
// and some OLX regions. Each platform file configures one of these
// with its own URL builder and selector sets; this struct does the fetching,
// challenge detection, and extraction once.
// =============================================================================

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use crate::adapters::common::{
    classify_status, detect_challenge, extract_with_selectors, filter_short_titles,
    raw_item_to_listing, random_user_agent, rotate_regions, RawItem, SelectorSet,
};
use crate::adapters::PlatformAdapter;
use crate::errors::AdapterErrorKind;
use crate::models::{Keyword, Listing, Platform};

/// Builds the full search URL for one (keyword, region) pair.
pub type UrlBuilder = fn(keyword: &str, region: &str) -> String;

pub struct HttpAdapter {
    client: Client,
    platform: Platform,
    regions: &'static [&'static str],
    build_url: UrlBuilder,
    selector_sets: Vec<SelectorSet>,
}

impl HttpAdapter {
    pub fn new(
        client: Client,
        platform: Platform,
        regions: &'static [&'static str],
        build_url: UrlBuilder,
        selector_sets: Vec<SelectorSet>,
    ) -> Self {
        Self { client, platform, regions, build_url, selector_sets }
    }

    async fn fetch_one(&self, keyword: &Keyword, region: &str) -> Result<Vec<RawItem>, AdapterErrorKind> {
        let url = (self.build_url)(&keyword.text, region);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", random_user_agent())
            .header("Accept-Language", "en-US,en;q=0.8")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterErrorKind::TransportTimeout
                } else {
                    AdapterErrorKind::TransportError(e.to_string())
                }
            })?;

        if let Some(err) = classify_status(response.status().as_u16()) {
            return Err(err);
        }

        let body = response.text().await.map_err(|e| AdapterErrorKind::TransportError(e.to_string()))?;

        if detect_challenge(&body) {
            return Err(AdapterErrorKind::BotChallenge);
        }

        let items = filter_short_titles(extract_with_selectors(&body, &url, &self.selector_sets));
        if items.is_empty() {
            return Err(AdapterErrorKind::ParseEmpty);
        }

        Ok(items)
    }
}

#[async_trait]
impl PlatformAdapter for HttpAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn scan(&self, keywords: &[Keyword], attempt_no: u32) -> (Vec<Listing>, Option<AdapterErrorKind>) {
        let region = rotate_regions(self.regions, attempt_no, 1)
            .first()
            .copied()
            .unwrap_or("");

        let futures_iter = keywords.iter().map(|kw| self.fetch_one(kw, region));
        let results = join_all(futures_iter).await;

        let mut listings = Vec::new();
        let mut worst_error = None;

        for (keyword, result) in keywords.iter().zip(results) {
            match result {
                Ok(items) => {
                    listings.extend(items.into_iter().map(|i| raw_item_to_listing(i, self.platform, &keyword.text)));
                }
                Err(err) => {
                    if err.is_permanent() {
                        warn!(platform = %self.platform, keyword = %keyword.text, "permanent block — abandoning rest of batch");
                        worst_error = Some(err);
                        break;
                    }
                    debug!(platform = %self.platform, keyword = %keyword.text, error = %err, "keyword scan failed");
                    worst_error = Some(err);
                }
            }
        }

        (listings, worst_error)
    }
}
