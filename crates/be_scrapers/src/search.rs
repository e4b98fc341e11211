use std::sync::Arc;

use be_core::{DocumentFetcher, Result};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Hard cap on reference URLs per query.
pub const MAX_REFERENCES: usize = 2;

/// Minimum snippet length for a result to count as long-form content when
/// its path carries no blog marker.
pub const SNIPPET_MIN_CHARS: usize = 50;

const SEARCH_URL: &str = "https://www.google.com/search?q=";

/// Hosts that never count as reference articles.
const DENYLIST: &[&str] = &[
    "google.com",
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "linkedin.com",
];

lazy_static! {
    static ref REDIRECT_TARGET: Regex = Regex::new(r"/url\?q=([^&]+)").unwrap();
    static ref DATED_PATH: Regex = Regex::new(r"/\d{4}/\d{2}/").unwrap();
}

/// A mined search result. Consumed immediately by the orchestrator; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

pub struct ReferenceFinder {
    fetcher: Arc<dyn DocumentFetcher>,
}

impl ReferenceFinder {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { fetcher }
    }

    /// Search for blog/article pages comparable to `query`. A transport
    /// failure propagates to the caller; an empty result does not.
    pub async fn find_references(&self, query: &str) -> Result<Vec<String>> {
        let search_url = format!("{}{}", SEARCH_URL, urlencoding::encode(query));
        let html = self.fetcher.fetch(&search_url).await?;
        let candidates = extract_reference_candidates(&html, MAX_REFERENCES);
        debug!("Mined {} search results for: {}", candidates.len(), query);
        Ok(candidates.into_iter().map(|c| c.url).collect())
    }
}

/// Mine result blocks for plausible article URLs. The primary pass walks
/// `div.g` result blocks; when it yields too few links a broader pass walks
/// every redirect-wrapped anchor on the page with the same acceptance rule
/// and cross-pass de-duplication.
pub fn extract_reference_candidates(html: &str, limit: usize) -> Vec<ReferenceCandidate> {
    let document = Html::parse_document(html);
    let result_block = Selector::parse("div.g").unwrap();
    let anchor = Selector::parse("a").unwrap();
    let heading = Selector::parse("h3").unwrap();
    let span = Selector::parse("span").unwrap();

    let mut candidates: Vec<ReferenceCandidate> = Vec::new();

    for block in document.select(&result_block) {
        if candidates.len() >= limit {
            break;
        }
        let Some(link) = block.select(&anchor).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(url) = unwrap_redirect(href) else {
            continue;
        };

        let title = block
            .select(&heading)
            .next()
            .map(|el| text_of(&el))
            .unwrap_or_default();
        let snippet = block
            .select(&span)
            .flat_map(|el| el.text())
            .collect::<String>()
            .trim()
            .to_string();

        if accepts(&url, &title, &snippet) && !candidates.iter().any(|c| c.url == url) {
            candidates.push(ReferenceCandidate { url, title, snippet });
        }
    }

    if candidates.len() < limit {
        let wrapped = Selector::parse("a[href*='/url?q=']").unwrap();
        for link in document.select(&wrapped) {
            if candidates.len() >= limit {
                break;
            }
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = unwrap_redirect(href) else {
                continue;
            };
            let title = nearest_heading(&link, &heading)
                .unwrap_or_else(|| text_of(&link));

            if accepts(&url, &title, "") && !candidates.iter().any(|c| c.url == url) {
                candidates.push(ReferenceCandidate {
                    url,
                    title,
                    snippet: String::new(),
                });
            }
        }
    }

    candidates
}

/// Search engines wrap result targets as `/url?q=<encoded-url>&...`; unwrap
/// when present, pass plain hrefs through.
fn unwrap_redirect(href: &str) -> Option<String> {
    match REDIRECT_TARGET.captures(href) {
        Some(captures) => urlencoding::decode(&captures[1])
            .ok()
            .map(|decoded| decoded.into_owned()),
        None => Some(href.to_string()),
    }
}

fn accepts(url: &str, title: &str, snippet: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if DENYLIST
        .iter()
        .any(|denied| host == *denied || host.ends_with(&format!(".{}", denied)))
    {
        return false;
    }
    if title.is_empty() {
        return false;
    }
    url.contains("/blog/")
        || url.contains("/article/")
        || url.contains("/post/")
        || DATED_PATH.is_match(url)
        || snippet.chars().count() > SNIPPET_MIN_CHARS
}

fn nearest_heading(link: &ElementRef, heading: &Selector) -> Option<String> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
        .and_then(|div| div.select(heading).next())
        .map(|el| text_of(&el))
        .filter(|title| !title.is_empty())
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
