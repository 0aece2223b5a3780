// adapters/mercari.rs — Mercari: plain HTTP + HTML, single US region.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["us"];

fn build_url(keyword: &str, _region: &str) -> String {
    format!("https://www.mercari.com/search/?keyword={}", urlencoding::encode(keyword))
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "div[data-testid='ItemCell']",
            title: "p[data-testid='ItemName']",
            price: Some("span[data-testid='ItemPrice']"),
            link: "a",
            image: Some("img"),
            location: None,
        },
        SelectorSet {
            item: "li.sc-item",
            title: "p.item-name",
            price: Some("span.item-price"),
            link: "a",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::Mercari, REGIONS, build_url, selector_sets())
}
