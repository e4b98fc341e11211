use be_core::{Error, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const DEFAULT_LISTING_URL: &str = "https://beyondchats.com/blogs/";
pub const DEFAULT_SOURCE: &str = "BeyondChats";
pub const DEFAULT_LISTING_LIMIT: usize = 5;

/// One row mined from the listing page. Body content is fetched separately
/// by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCandidate {
    pub title: String,
    pub url: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub published_at: Option<String>,
}

/// A blog index page to ingest from.
#[derive(Debug, Clone)]
pub struct BlogListing {
    base_url: Url,
    source: String,
    limit: usize,
}

impl BlogListing {
    pub fn new(base_url: &str, source: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            base_url,
            source: source.to_string(),
            limit: DEFAULT_LISTING_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn extract(&self, html: &str) -> Vec<ListingCandidate> {
        extract_listing(html, &self.base_url, self.limit)
    }
}

impl Default for BlogListing {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_LISTING_URL).unwrap(),
            source: DEFAULT_SOURCE.to_string(),
            limit: DEFAULT_LISTING_LIMIT,
        }
    }
}

/// Mine up to `limit` candidates from a listing page, in document order.
/// Each field tries a precise selector first, then a generic fallback.
/// Candidates without a resolvable title and URL are dropped without
/// backfilling from beyond the limit.
pub fn extract_listing(html: &str, base: &Url, limit: usize) -> Vec<ListingCandidate> {
    let document = Html::parse_document(html);
    let card = Selector::parse("article.entry-card").unwrap();
    let title_link = Selector::parse("h2.entry-title a").unwrap();
    let excerpt_precise = Selector::parse(".entry-excerpt .has-excerpt-area p").unwrap();
    let excerpt_generic = Selector::parse(".entry-excerpt p").unwrap();
    let author_precise = Selector::parse(".meta-author .ct-meta-element-author span").unwrap();
    let author_generic = Selector::parse(".meta-author a").unwrap();
    let image_precise = Selector::parse(".ct-media-container img").unwrap();
    let image_generic = Selector::parse("img").unwrap();
    let date_precise = Selector::parse(".meta-date time").unwrap();
    let date_generic = Selector::parse("time").unwrap();

    let mut candidates = Vec::new();
    for element in document.select(&card).take(limit) {
        let Some(link) = element.select(&title_link).next() else {
            continue;
        };
        let title = text_of(&link);
        let Some(href) = link.value().attr("href").filter(|h| !h.is_empty()) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        let Some(url) = resolve(base, href) else {
            continue;
        };

        let excerpt = element
            .select(&excerpt_precise)
            .next()
            .map(|el| text_of(&el))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                element
                    .select(&excerpt_generic)
                    .next()
                    .map(|el| text_of(&el))
                    .filter(|t| !t.is_empty())
            });

        let author = element
            .select(&author_precise)
            .next()
            .map(|el| text_of(&el))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                element
                    .select(&author_generic)
                    .last()
                    .map(|el| text_of(&el))
                    .filter(|t| !t.is_empty())
            });

        let image = element
            .select(&image_precise)
            .next()
            .and_then(|el| el.value().attr("src"))
            .or_else(|| {
                element
                    .select(&image_generic)
                    .next()
                    .and_then(|el| el.value().attr("src"))
            })
            .filter(|src| !src.is_empty())
            .and_then(|src| resolve(base, src));

        let published_at = element
            .select(&date_precise)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .or_else(|| {
                element
                    .select(&date_generic)
                    .next()
                    .and_then(|el| el.value().attr("datetime"))
            })
            .filter(|dt| !dt.is_empty())
            .map(str::to_string);

        candidates.push(ListingCandidate {
            title,
            url,
            excerpt,
            author,
            image,
            published_at,
        });
    }

    candidates
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    if href.starts_with("http") {
        Some(href.to_string())
    } else {
        base.join(href).ok().map(|u| u.to_string())
    }
}
