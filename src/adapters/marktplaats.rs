// adapters/marktplaats.rs — Marktplaats (Netherlands): plain HTTP + HTML, single region.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["nl"];

fn build_url(keyword: &str, _region: &str) -> String {
    format!("https://www.marktplaats.nl/q/{}/", urlencoding::encode(keyword))
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "li.hz-Listing",
            title: "h3.hz-Listing-title",
            price: Some("span.hz-Listing-price"),
            link: "a.hz-Listing-coverLink",
            image: Some("img"),
            location: Some("span.hz-Listing-distance-label"),
        },
        SelectorSet {
            item: "div.mp-Listing-item",
            title: "h2",
            price: Some("span.price"),
            link: "a",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::Marktplaats, REGIONS, build_url, selector_sets())
}
