use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Structural elements removed before any text extraction.
const STRIP_SELECTOR: &str =
    "script, style, nav, header, footer, aside, .sidebar, .menu, .navigation";

/// Ordered most specific first; the first container clearing the length
/// threshold wins.
const CONTENT_SELECTORS: &[&str] = &[
    "article .entry-content",
    "article .post-content",
    "article .article-content",
    ".entry-content",
    ".post-content",
    ".article-content",
    "article",
    ".content",
    "main",
    ".main-content",
];

/// Minimum text length for a selector candidate to count as real content.
pub const SELECTOR_THRESHOLD_CHARS: usize = 200;

/// Paragraphs at or below this length are skipped by the aggregation
/// fallback.
pub const PARAGRAPH_MIN_CHARS: usize = 50;

lazy_static! {
    static ref RUNS_OF_SPACES: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n").unwrap();
}

/// Best-effort main-body extraction. Never fails; an empty string means the
/// heuristics found nothing and the caller decides what that implies.
pub fn extract(html: &str) -> String {
    let mut document = Html::parse_document(html);
    strip_boilerplate(&mut document);

    for selector in CONTENT_SELECTORS {
        let selector = Selector::parse(selector).unwrap();
        if let Some(element) = document.select(&selector).next() {
            let text = normalize_whitespace(&element_text(&element));
            if text.chars().count() >= SELECTOR_THRESHOLD_CHARS {
                return text;
            }
        }
    }

    // Unconventional markup: recover whatever substantial paragraphs exist,
    // at the cost of losing heading structure.
    aggregate_paragraphs(&document)
}

fn strip_boilerplate(document: &mut Html) {
    let selector = Selector::parse(STRIP_SELECTOR).unwrap();
    let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn aggregate_paragraphs(document: &Html) -> String {
    let selector = Selector::parse("p").unwrap();
    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|el| element_text(&el).trim().to_string())
        .filter(|text| text.chars().count() > PARAGRAPH_MIN_CHARS)
        .collect();
    normalize_whitespace(&paragraphs.join("\n\n"))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    let collapsed = RUNS_OF_SPACES.replace_all(text, " ");
    let collapsed = BLANK_LINES.replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}
