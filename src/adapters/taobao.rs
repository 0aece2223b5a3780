// adapters/taobao.rs — Taobao: headless, single region.

use crate::adapters::common::SelectorSet;
use crate::adapters::headless::HeadlessAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["cn"];

fn build_url(keyword: &str, _region: &str) -> String {
    format!("https://s.taobao.com/search?q={}", urlencoding::encode(keyword))
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "div.items > div.item",
            title: "a.title",
            price: Some("strong"),
            link: "a.title",
            image: Some("img"),
            location: Some("div.location"),
        },
        SelectorSet {
            item: "div.Card--doubleCardWrapper--L2XFE73",
            title: "div.Title--title--jCOyjfG",
            price: Some("div.Price--priceInt--ZlsSi_M"),
            link: "a",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(webdriver_url: String) -> HeadlessAdapter {
    HeadlessAdapter::new(webdriver_url, Platform::Taobao, REGIONS, build_url, selector_sets())
}
