// adapters/facebook_marketplace.rs — Facebook Marketplace: headless, city rotation.
//
// Lowest scheduler weight and longest inter-cycle delay of the roster — the
// strictest bot defenses and lowest reliable yield.

use crate::adapters::common::SelectorSet;
use crate::adapters::headless::HeadlessAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["newyork", "losangeles", "london", "toronto"];

fn build_url(keyword: &str, region: &str) -> String {
    format!(
        "https://www.facebook.com/marketplace/{region}/search?query={}",
        urlencoding::encode(keyword)
    )
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "div[data-testid='marketplace_feed_item']",
            title: "span[data-testid='marketplace_feed_item_title']",
            price: Some("span[data-testid='marketplace_feed_item_price']"),
            link: "a",
            image: Some("img"),
            location: Some("span[data-testid='marketplace_feed_item_location']"),
        },
        SelectorSet {
            item: "div.x9f619",
            title: "span.x1lliihq",
            price: Some("span.x1anpbxc"),
            link: "a",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(webdriver_url: String) -> HeadlessAdapter {
    HeadlessAdapter::new(webdriver_url, Platform::FacebookMarketplace, REGIONS, build_url, selector_sets())
}
