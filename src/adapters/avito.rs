// adapters/avito.rs — Avito: plain HTTP + HTML, Russian city rotation.
//
// Highest scheduler weight (4) of the whole roster — historically the
// highest-yield platform for this domain.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["moskva", "sankt-peterburg", "ekaterinburg", "novosibirsk", "krasnodar"];

fn build_url(keyword: &str, region: &str) -> String {
    format!("https://www.avito.ru/{region}?q={}", urlencoding::encode(keyword))
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "div[data-marker='item']",
            title: "h3[itemprop='name']",
            price: Some("meta[itemprop='price']"),
            link: "a[data-marker='item-title']",
            image: Some("img"),
            location: Some("div[data-marker='item-address']"),
        },
        SelectorSet {
            item: "div.iva-item-root",
            title: "a.iva-item-titleStep",
            price: Some("p.iva-item-priceStep"),
            link: "a.iva-item-titleStep",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::Avito, REGIONS, build_url, selector_sets())
}
