// =============================================================================
// adapters/common.rs — SHARED ADAPTER MACHINERY
// =============================================================================
//
// Pieces every Platform Adapter needs regardless of transport: a raw
// extracted item shape, ordered selector-set extraction,
// region-rotation-by-attempt-number, and the anti-bot posture primitives
// headless adapters use (viewport/UA randomization, dwell jitter, challenge
// detection). Grounded in the teacher's per-scanner structure (atomic
// rotation index, structured `info!`/`warn!` logging) generalized across
// transports instead of duplicated per source.
// =============================================================================

use rand::Rng;
use scraper::{Html, Selector};

use crate::errors::AdapterErrorKind;
use crate::models::Listing;

/// An item as scraped off the page, before it's promoted to a `Listing`.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub title: String,
    pub price_text: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub native_item_id: Option<String>,
}

/// One candidate way of finding items on a page: a selector for the item
/// container plus selectors for each field relative to it.
pub struct SelectorSet {
    pub item: &'static str,
    pub title: &'static str,
    pub price: Option<&'static str>,
    pub link: &'static str,
    pub image: Option<&'static str>,
    pub location: Option<&'static str>,
}

/// Try each selector set in order (primary, secondary, fallback) and accept
/// the first that yields at least one item.
pub fn extract_with_selectors(html: &str, base_url: &str, sets: &[SelectorSet]) -> Vec<RawItem> {
    let document = Html::parse_document(html);

    for set in sets {
        let Ok(item_sel) = Selector::parse(set.item) else { continue };
        let Ok(title_sel) = Selector::parse(set.title) else { continue };
        let Ok(link_sel) = Selector::parse(set.link) else { continue };
        let price_sel = set.price.and_then(|s| Selector::parse(s).ok());
        let image_sel = set.image.and_then(|s| Selector::parse(s).ok());
        let location_sel = set.location.and_then(|s| Selector::parse(s).ok());

        let mut items = Vec::new();
        for el in document.select(&item_sel) {
            let title = el
                .select(&title_sel)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            let url = el
                .select(&link_sel)
                .next()
                .and_then(|l| l.value().attr("href"))
                .map(|href| absolutize(base_url, href))
                .unwrap_or_default();

            if title.is_empty() || url.is_empty() {
                continue;
            }

            let price_text = price_sel
                .as_ref()
                .and_then(|s| el.select(s).next())
                .map(|p| p.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty());

            let image_url = image_sel
                .as_ref()
                .and_then(|s| el.select(s).next())
                .and_then(|i| i.value().attr("src").or_else(|| i.value().attr("data-src")))
                .map(|s| absolutize(base_url, s));

            let location = location_sel
                .as_ref()
                .and_then(|s| el.select(s).next())
                .map(|l| l.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty());

            items.push(RawItem {
                title,
                price_text,
                url,
                image_url,
                location,
                native_item_id: None,
            });
        }

        if !items.is_empty() {
            return items;
        }
    }

    vec![]
}

fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Ok(base) = url::Url::parse(base_url) {
        base.join(href).map(|u| u.to_string()).unwrap_or_default()
    } else {
        href.to_string()
    }
}

/// Filter out items whose normalized title is too short to be meaningful —
/// title length post-normalization under 6 characters.
pub fn filter_short_titles(items: Vec<RawItem>) -> Vec<RawItem> {
    items
        .into_iter()
        .filter(|i| i.title.split_whitespace().collect::<String>().len() >= 6)
        .collect()
}

pub fn raw_item_to_listing(item: RawItem, platform: crate::models::Platform, search_term: &str) -> Listing {
    Listing {
        platform,
        search_term: search_term.to_string(),
        title: item.title,
        description: None,
        price_text: item.price_text,
        url: item.url,
        native_item_id: item.native_item_id,
        location: item.location,
        observed_at: chrono::Utc::now(),
        image_url: item.image_url,
    }
}

/// Pick a subset of `regions`, indexed by `attempt_no`, so repeated calls
/// spread across different locales/cities instead of hammering one.
pub fn rotate_regions<'a>(regions: &[&'a str], attempt_no: u32, window: usize) -> Vec<&'a str> {
    if regions.is_empty() {
        return vec![];
    }
    let start = (attempt_no as usize) % regions.len();
    (0..window.min(regions.len()))
        .map(|i| regions[(start + i) % regions.len()])
        .collect()
}

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

const VIEWPORTS: &[(u32, u32)] = &[(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// Pick a user agent and viewport for this attempt, for headless adapters'
/// anti-bot posture.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())]
}

pub fn random_viewport() -> (u32, u32) {
    VIEWPORTS[rand::thread_rng().gen_range(0..VIEWPORTS.len())]
}

/// Randomized human-like dwell time before interacting, in milliseconds.
pub fn random_dwell_millis() -> u64 {
    rand::thread_rng().gen_range(3000..=8000)
}

/// The init script injected into a headless page to mask common automation
/// fingerprints: hide the webdriver flag, populate plugins/languages, and
/// remove automation globals that challenge scripts probe for.
pub const FINGERPRINT_MASK_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
delete window.__webdriver_evaluate;
delete window.__selenium_evaluate;
delete window.__webdriver_script_function;
"#;

/// Known CAPTCHA/challenge DOM signatures. Detection means: abandon the
/// current term and back off rather than retry.
const CHALLENGE_SIGNATURES: &[&str] = &[
    "g-recaptcha",
    "h-captcha",
    "cf-challenge",
    "id=\"challenge-form\"",
    "verify you are human",
    "unusual traffic",
    "slider-captcha",
];

pub fn detect_challenge(html: &str) -> bool {
    let lower = html.to_lowercase();
    CHALLENGE_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Classify an HTTP response into the adapter error taxonomy.
pub fn classify_status(status: u16) -> Option<AdapterErrorKind> {
    match status {
        200..=299 => None,
        403 | 401 => Some(AdapterErrorKind::PermanentBlock),
        429 => Some(AdapterErrorKind::RateLimited),
        500..=599 => Some(AdapterErrorKind::ServerError),
        _ => Some(AdapterErrorKind::TransportError(format!("unexpected status {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_regions_wraps_by_attempt_no() {
        let regions = ["a", "b", "c"];
        assert_eq!(rotate_regions(&regions, 0, 2), vec!["a", "b"]);
        assert_eq!(rotate_regions(&regions, 2, 2), vec!["c", "a"]);
        assert_eq!(rotate_regions(&regions, 4, 2), vec!["b", "c"]);
    }

    #[test]
    fn filter_short_titles_drops_under_six_chars() {
        let items = vec![
            RawItem { title: "abc".to_string(), url: "https://x".to_string(), ..Default::default() },
            RawItem { title: "a proper title here".to_string(), url: "https://x".to_string(), ..Default::default() },
        ];
        let kept = filter_short_titles(items);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn detects_known_challenge_signatures() {
        assert!(detect_challenge("<div class='g-recaptcha'></div>"));
        assert!(detect_challenge("Please verify you are human"));
        assert!(!detect_challenge("<html><body>normal listing page</body></html>"));
    }

    #[test]
    fn classifies_status_codes() {
        assert_eq!(classify_status(200), None);
        assert_eq!(classify_status(403), Some(AdapterErrorKind::PermanentBlock));
        assert_eq!(classify_status(429), Some(AdapterErrorKind::RateLimited));
        assert_eq!(classify_status(503), Some(AdapterErrorKind::ServerError));
    }
}
