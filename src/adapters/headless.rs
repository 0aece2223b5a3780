// =============================================================================
// adapters/headless.rs — HEADLESS BROWSER ADAPTER
// =============================================================================
//
// Shared implementation for the marketplaces that require a real rendering
// engine to pass their bot defenses: AliExpress, Taobao, Facebook
// Marketplace. Anti-bot posture: randomized viewport and user agent,
// a fingerprint-masking init script, a human-like dwell before reading the
// DOM, and a scroll to trigger lazy-loaded results. A detected challenge
// abandons the current keyword rather than retrying it.
//
// One browser session is opened per scan call and reused across the whole
// keyword batch — session setup is the expensive part, not navigation.
// =============================================================================

use async_trait::async_trait;
use fantoccini::ClientBuilder;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::adapters::common::{
    detect_challenge, extract_with_selectors, filter_short_titles, raw_item_to_listing,
    random_dwell_millis, random_viewport, rotate_regions, SelectorSet, FINGERPRINT_MASK_SCRIPT,
};
use crate::adapters::PlatformAdapter;
use crate::errors::AdapterErrorKind;
use crate::models::{Keyword, Listing, Platform};

pub type UrlBuilder = fn(keyword: &str, region: &str) -> String;

pub struct HeadlessAdapter {
    webdriver_url: String,
    platform: Platform,
    regions: &'static [&'static str],
    build_url: UrlBuilder,
    selector_sets: Vec<SelectorSet>,
}

impl HeadlessAdapter {
    pub fn new(
        webdriver_url: String,
        platform: Platform,
        regions: &'static [&'static str],
        build_url: UrlBuilder,
        selector_sets: Vec<SelectorSet>,
    ) -> Self {
        Self { webdriver_url, platform, regions, build_url, selector_sets }
    }
}

#[async_trait]
impl PlatformAdapter for HeadlessAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn scan(&self, keywords: &[Keyword], attempt_no: u32) -> (Vec<Listing>, Option<AdapterErrorKind>) {
        let region = rotate_regions(self.regions, attempt_no, 1)
            .first()
            .copied()
            .unwrap_or("");

        let (width, height) = random_viewport();

        let client = match ClientBuilder::native().connect(&self.webdriver_url).await {
            Ok(c) => c,
            Err(e) => {
                warn!(platform = %self.platform, error = %e, "failed to start headless session");
                return (vec![], Some(AdapterErrorKind::TransportError(e.to_string())));
            }
        };

        if let Err(e) = client.set_window_size(width, height).await {
            debug!(platform = %self.platform, error = %e, "failed to set viewport, continuing anyway");
        }
        let _ = client.execute(FINGERPRINT_MASK_SCRIPT, vec![]).await;

        let mut listings = Vec::new();
        let mut worst_error = None;

        for keyword in keywords {
            let url = (self.build_url)(&keyword.text, region);

            if let Err(e) = client.goto(&url).await {
                debug!(platform = %self.platform, keyword = %keyword.text, error = %e, "navigation failed");
                worst_error = Some(AdapterErrorKind::TransportError(e.to_string()));
                continue;
            }

            sleep(Duration::from_millis(random_dwell_millis())).await;
            let _ = client.execute("window.scrollTo(0, document.body.scrollHeight / 2)", vec![]).await;
            sleep(Duration::from_millis(random_dwell_millis() / 2)).await;
            let _ = client.execute("window.scrollTo(0, document.body.scrollHeight)", vec![]).await;
            sleep(Duration::from_millis(500)).await;

            let html = match client.source().await {
                Ok(h) => h,
                Err(e) => {
                    worst_error = Some(AdapterErrorKind::TransportError(e.to_string()));
                    continue;
                }
            };

            if detect_challenge(&html) {
                warn!(platform = %self.platform, keyword = %keyword.text, "bot challenge detected — abandoning this keyword");
                worst_error = Some(AdapterErrorKind::BotChallenge);
                continue;
            }

            let found = filter_short_titles(extract_with_selectors(&html, &url, &self.selector_sets));
            if found.is_empty() {
                worst_error = Some(AdapterErrorKind::ParseEmpty);
                continue;
            }
            listings.extend(found.into_iter().map(|i| raw_item_to_listing(i, self.platform, &keyword.text)));
        }

        let _ = client.close().await;

        (listings, worst_error)
    }
}
