// adapters/olx.rs — OLX: plain HTTP + HTML across several country TLDs.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["pl", "ua", "bg", "pt", "ro"];

fn build_url(keyword: &str, region: &str) -> String {
    format!(
        "https://www.olx.{region}/oferty/q-{}/",
        urlencoding::encode(keyword)
    )
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "div[data-cy='l-card']",
            title: "h6",
            price: Some("p[data-testid='ad-price']"),
            link: "a",
            image: Some("img"),
            location: Some("p[data-testid='location-date']"),
        },
        SelectorSet {
            item: "table.offers tr.wrap",
            title: "strong",
            price: Some("p.price"),
            link: "a.marginright5",
            image: None,
            location: Some("small.breadcrumb"),
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::Olx, REGIONS, build_url, selector_sets())
}
