// adapters/mercadolibre.rs — MercadoLibre: plain HTTP + HTML, country rotation.

use reqwest::Client;

use crate::adapters::common::SelectorSet;
use crate::adapters::http_adapter::HttpAdapter;
use crate::models::Platform;

const REGIONS: &[&str] = &["com.mx", "com.ar", "com.co", "cl", "com.pe"];

fn build_url(keyword: &str, region: &str) -> String {
    format!(
        "https://listado.mercadolibre.{region}/{}",
        urlencoding::encode(keyword)
    )
}

fn selector_sets() -> Vec<SelectorSet> {
    vec![
        SelectorSet {
            item: "li.ui-search-layout__item",
            title: "h2.ui-search-item__title",
            price: Some("span.andes-money-amount__fraction"),
            link: "a.ui-search-link",
            image: Some("img.ui-search-result-image__element"),
            location: Some("span.ui-search-item__location-label"),
        },
        SelectorSet {
            item: "div.results-item",
            title: "h2",
            price: Some("span.price"),
            link: "a",
            image: None,
            location: None,
        },
    ]
}

pub fn adapter(client: Client) -> HttpAdapter {
    HttpAdapter::new(client, Platform::MercadoLibre, REGIONS, build_url, selector_sets())
}
