// adapters/aliexpress.rs — AliExpress: headless, single region.

use crate::adapters::common::SelectorSet;
use crate::adapters::headless::HeadlessAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["global"];

fn build_url(keyword: &str, _region: &str) -> String {
    format!(
        "https://www.aliexpress.com/wholesale?SearchText={}",
        urlencoding::encode(keyword)
    )
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "div.search-item-card-wrapper-gallery",
            title: "h1, h3",
            price: Some("div.multi--price-sale--U-S0jtj"),
            link: "a",
            image: Some("img"),
            location: None,
        },
        SelectorSet {
            item: "div.list--gallery--C2f2tvm",
            title: "a.multi--titleText--nXeOvyr",
            price: Some("div.multi--price-sale--U-S0jtj"),
            link: "a.multi--titleText--nXeOvyr",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(webdriver_url: String) -> HeadlessAdapter {
    HeadlessAdapter::new(webdriver_url, Platform::AliExpress, REGIONS, build_url, selector_sets())
}
