// =============================================================================
// adapters/ebay.rs — EBAY BROWSE API ADAPTER
// =============================================================================
//
// The one adapter with a formal, authenticated contract: the eBay Browse
// API. OAuth2 client-credentials, token cached until `expires_in - 60s`,
// `item_summary/search?q=...&limit=...` against the Browse API. Everyone
// else on the roster scrapes HTML or drives a browser; eBay just hands back
// JSON.
// =============================================================================

use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::adapters::common::{classify_status, raw_item_to_listing, RawItem};
use crate::adapters::PlatformAdapter;
use crate::errors::AdapterErrorKind;
use crate::models::{Keyword, Listing, Platform};

const TOKEN_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";
const SEARCH_URL: &str = "https://api.ebay.com/buy/browse/v1/item_summary/search";
const SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "itemSummaries")]
    item_summaries: Vec<ItemSummary>,
}

#[derive(Deserialize)]
struct ItemSummary {
    title: String,
    #[serde(rename = "itemWebUrl")]
    item_web_url: String,
    #[serde(rename = "itemId")]
    item_id: Option<String>,
    price: Option<Price>,
    #[serde(rename = "itemLocation")]
    item_location: Option<ItemLocation>,
    image: Option<Image>,
}

#[derive(Deserialize)]
struct Price {
    value: String,
    currency: Option<String>,
}

#[derive(Deserialize)]
struct ItemLocation {
    #[serde(rename = "postalCode")]
    postal_code: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize)]
struct Image {
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct EbayAdapter {
    client: Client,
    app_id: String,
    cert_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl EbayAdapter {
    pub fn new(client: Client, app_id: String, cert_id: String) -> Self {
        Self { client, app_id, cert_id, token: Mutex::new(None) }
    }

    async fn valid_token(&self) -> Result<String, AdapterErrorKind> {
        if let Some(cached) = self.token.lock().as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.app_id, self.cert_id));

        let response = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {credentials}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!("grant_type=client_credentials&scope={}", urlencoding::encode(SCOPE)))
            .send()
            .await
            .map_err(|e| AdapterErrorKind::TransportError(e.to_string()))?;

        if let Some(err) = classify_status(response.status().as_u16()) {
            return Err(err);
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterErrorKind::TransportError(e.to_string()))?;

        let expires_at = Instant::now() + Duration::from_secs(parsed.expires_in.saturating_sub(60));
        let token = parsed.access_token.clone();
        *self.token.lock() = Some(CachedToken { token: parsed.access_token, expires_at });

        Ok(token)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<RawItem>, AdapterErrorKind> {
        let token = self.valid_token().await?;

        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&token)
            .header("X-EBAY-C-MARKETPLACE-ID", "EBAY_US")
            .query(&[("q", keyword), ("limit", "50")])
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

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterErrorKind::TransportError(e.to_string()))?;

        if parsed.item_summaries.is_empty() {
            return Err(AdapterErrorKind::ParseEmpty);
        }

        Ok(parsed
            .item_summaries
            .into_iter()
            .map(|item| RawItem {
                title: item.title,
                price_text: item.price.map(|p| match p.currency {
                    Some(c) => format!("{} {}", p.value, c),
                    None => p.value,
                }),
                url: item.item_web_url,
                image_url: item.image.and_then(|i| i.image_url),
                location: item.item_location.and_then(|l| l.postal_code.or(l.country)),
                native_item_id: item.item_id,
            })
            .collect())
    }
}

#[async_trait]
impl PlatformAdapter for EbayAdapter {
    fn platform(&self) -> Platform {
        Platform::Ebay
    }

    async fn scan(&self, keywords: &[Keyword], _attempt_no: u32) -> (Vec<Listing>, Option<AdapterErrorKind>) {
        let mut listings = Vec::new();
        let mut worst_error = None;

        for keyword in keywords {
            match self.search(&keyword.text).await {
                Ok(items) => {
                    listings.extend(items.into_iter().map(|i| raw_item_to_listing(i, Platform::Ebay, &keyword.text)));
                }
                Err(err) => {
                    if err.is_permanent() {
                        warn!(keyword = %keyword.text, "eBay adapter permanently blocked — abandoning batch");
                        worst_error = Some(err);
                        break;
                    }
                    debug!(keyword = %keyword.text, error = %err, "eBay search failed");
                    worst_error = Some(err);
                }
            }
        }

        (listings, worst_error)
    }
}
