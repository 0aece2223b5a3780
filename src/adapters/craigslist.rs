// adapters/craigslist.rs — Craigslist: plain HTTP + HTML, city rotation.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &[
    "newyork", "losangeles", "chicago", "houston", "miami", "seattle", "atlanta", "boston",
];

fn build_url(keyword: &str, region: &str) -> String {
    format!(
        "https://{region}.craigslist.org/search/sss?query={}",
        urlencoding::encode(keyword)
    )
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "li.cl-static-search-result",
            title: "div.title",
            price: Some("div.price"),
            link: "a",
            image: Some("img"),
            location: Some("div.location"),
        },
        SelectorSet {
            item: "div.result-info",
            title: "a.result-title",
            price: Some("span.result-price"),
            link: "a.result-title",
            image: None,
            location: Some("span.result-hood"),
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::Craigslist, REGIONS, build_url, selector_sets())
}
