// adapters/gumtree.rs — Gumtree: plain HTTP + HTML, UK city rotation.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["london", "manchester", "birmingham", "leeds", "glasgow"];

fn build_url(keyword: &str, region: &str) -> String {
    format!(
        "https://www.gumtree.com/search?search_location={region}&q={}",
        urlencoding::encode(keyword)
    )
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "article.listing-maxi",
            title: "h2.listing-title",
            price: Some("strong.listing-price"),
            link: "a.listing-link",
            image: Some("img"),
            location: Some("span.listing-location"),
        },
        SelectorSet {
            item: "div.natural",
            title: "a.listing-link",
            price: Some("span.ad-price"),
            link: "a.listing-link",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::Gumtree, REGIONS, build_url, selector_sets())
}
