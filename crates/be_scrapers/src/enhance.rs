use std::sync::Arc;

use be_core::{
    Article, ArticleStore, ArticleVersion, DocumentFetcher, Error, Result, TextGenerator,
};
use tracing::{info, warn};

use crate::extract::extract;
use crate::search::{ReferenceFinder, MAX_REFERENCES};

/// Minimum body length before enhancement proceeds.
pub const MIN_CONTENT_CHARS: usize = 50;

/// Minimum extracted length for a scraped reference to be usable.
pub const MIN_REFERENCE_CHARS: usize = 200;

/// Terminal state of one enhancement attempt. Generation and persistence
/// failures surface as errors instead, fatal to the article only.
#[derive(Debug, Clone)]
pub enum EnhanceOutcome {
    Enhanced(Article),
    SkippedAlreadyEnhanced,
    SkippedInsufficientContent,
}

#[derive(Debug, Clone)]
struct ReferenceContent {
    url: String,
    content: String,
}

pub struct Enhancer {
    store: Arc<dyn ArticleStore>,
    generator: Arc<dyn TextGenerator>,
    fetcher: Arc<dyn DocumentFetcher>,
    finder: ReferenceFinder,
}

impl Enhancer {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        generator: Arc<dyn TextGenerator>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        let finder = ReferenceFinder::new(fetcher.clone());
        Self {
            store,
            generator,
            fetcher,
            finder,
        }
    }

    pub async fn enhance_article(&self, article: &Article) -> Result<EnhanceOutcome> {
        info!("📰 Processing article: {}", article.title);

        match self
            .store
            .find_by_url(&article.url, Some(ArticleVersion::Updated))
            .await
        {
            Ok(Some(_)) => {
                info!("⏭️ Already enhanced, skipping: {}", article.url);
                return Ok(EnhanceOutcome::SkippedAlreadyEnhanced);
            }
            Ok(None) => {}
            Err(e) => warn!("Duplicate check failed for {}, continuing: {}", article.url, e),
        }

        let references = self.gather_references(&article.title).await;
        // Below the quality bar the partial set is discarded entirely; the
        // prompt branches only on "has references" vs "none".
        let references = if references.len() < MAX_REFERENCES {
            Vec::new()
        } else {
            references
        };

        let content = match self.sufficient_content(article).await {
            Some(content) => content,
            None => {
                info!("⏭️ Content too short to enhance, skipping: {}", article.url);
                return Ok(EnhanceOutcome::SkippedInsufficientContent);
            }
        };

        info!(
            "🤖 Rewriting article with {} reference(s): {}",
            references.len(),
            article.title
        );
        let prompt = build_prompt(&article.title, &content, &references);
        let generated = match self.generator.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => return Err(Error::Generation(e.to_string())),
        };
        if generated.is_empty() {
            return Err(Error::Generation(
                "Generator returned empty content".to_string(),
            ));
        }

        let mut final_content = generated;
        if !references.is_empty() {
            final_content.push_str(&references_section(&references));
        }

        let updated = Article {
            id: None,
            title: article.title.clone(),
            url: article.url.clone(),
            version: ArticleVersion::Updated,
            excerpt: article.excerpt.clone(),
            content: Some(final_content),
            author: article.author.clone(),
            image: article.image.clone(),
            published_at: article.published_at.clone(),
            source: article.source.clone(),
            references: references.iter().map(|r| r.url.clone()).collect(),
            created_at: None,
            updated_at: None,
        };

        match self.store.create(&updated).await {
            Ok(stored) => {
                info!("✨ Enhanced article stored: {}", stored.title);
                Ok(EnhanceOutcome::Enhanced(stored))
            }
            Err(Error::AlreadyExists(..)) => Ok(EnhanceOutcome::SkippedAlreadyEnhanced),
            Err(e) => Err(e),
        }
    }

    /// Best-effort reference gathering; any failure shrinks the set instead
    /// of aborting the pipeline.
    async fn gather_references(&self, title: &str) -> Vec<ReferenceContent> {
        info!("🔍 Searching for reference articles: {}", title);
        let urls = match self.finder.find_references(title).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!("Reference search failed, enhancing without references: {}", e);
                return Vec::new();
            }
        };
        if urls.len() < MAX_REFERENCES {
            return Vec::new();
        }

        let mut references = Vec::new();
        for url in urls {
            info!("🦗 Scraping reference: {}", url);
            match self.fetcher.fetch(&url).await {
                Ok(html) => {
                    let content = extract(&html);
                    if content.chars().count() > MIN_REFERENCE_CHARS {
                        references.push(ReferenceContent { url, content });
                    } else {
                        info!("Reference content too thin, dropped: {}", url);
                    }
                }
                Err(e) => warn!("Failed to scrape reference {}: {}", url, e),
            }
        }
        references
    }

    /// Resolve a usable body: the stored content, else a re-extraction from
    /// the article's own URL, else the stored excerpt.
    async fn sufficient_content(&self, article: &Article) -> Option<String> {
        let stored = article.content.clone().unwrap_or_default();
        if char_len(stored.trim()) >= MIN_CONTENT_CHARS {
            return Some(stored);
        }

        info!("Stored content missing or too short, refetching: {}", article.url);
        let refetched = match self.fetcher.fetch(&article.url).await {
            Ok(html) => extract(&html),
            Err(e) => {
                warn!("Failed to refetch {}: {}", article.url, e);
                String::new()
            }
        };
        let content = if char_len(refetched.trim()) >= MIN_CONTENT_CHARS {
            refetched
        } else {
            article.excerpt.clone().unwrap_or_default()
        };

        if char_len(content.trim()) >= MIN_CONTENT_CHARS {
            Some(content)
        } else {
            None
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn build_prompt(title: &str, content: &str, references: &[ReferenceContent]) -> String {
    if references.is_empty() {
        format!(
            "You are an expert content writer. Your task is to enhance and rewrite the following article to make it more engaging, professional, and well-structured.\n\nOriginal Article:\nTitle: {}\nContent: {}\n\nPlease rewrite the article to:\n1. Improve the writing style and tone to be more engaging and professional\n2. Enhance the formatting and structure with proper headings and paragraphs\n3. Expand on key points while maintaining the original message\n4. Make it more readable with better flow and transitions\n5. Ensure proper paragraph breaks and readability\n\nReturn only the enhanced article content, without any additional commentary or explanations.",
            title, content
        )
    } else {
        let reference_texts = references
            .iter()
            .enumerate()
            .map(|(idx, r)| format!("Reference Article {}:\n{}", idx + 1, r.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        format!(
            "You are an expert content writer. Your task is to enhance and rewrite the following article to match the style, formatting, and quality of the reference articles provided.\n\nOriginal Article:\nTitle: {}\nContent: {}\n\nReference Articles (for style and formatting reference):\n{}\n\nPlease rewrite the article to:\n1. Match the writing style and tone of the reference articles\n2. Improve the formatting and structure\n3. Enhance the content quality while maintaining the original message\n4. Make it more engaging and professional\n5. Ensure proper paragraph breaks and readability\n\nReturn only the enhanced article content, without any additional commentary or explanations.",
            title, content, reference_texts
        )
    }
}

fn references_section(references: &[ReferenceContent]) -> String {
    let items = references
        .iter()
        .enumerate()
        .map(|(idx, r)| format!("{}. [{}]({})", idx + 1, r.url, r.url))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n---\n\n## References\n\n{}", items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use be_storage::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MapFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl DocumentFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Scraping(format!("unreachable: {}", url)))
        }
    }

    struct RecordingGenerator {
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
        response: Result<String>,
    }

    impl RecordingGenerator {
        fn returning(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                response: Ok(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                response: Err(Error::Generation("boom".to_string())),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> Option<String> {
            self.last_prompt.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        fn name(&self) -> &str {
            "Recording"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Generation(e.to_string())),
            }
        }
    }

    fn original(url: &str, content: &str) -> Article {
        Article {
            id: None,
            title: "Scaling Support".to_string(),
            url: url.to_string(),
            version: ArticleVersion::Original,
            excerpt: None,
            content: if content.is_empty() {
                None
            } else {
                Some(content.to_string())
            },
            author: Some("Jane Doe".to_string()),
            image: None,
            published_at: Some("2024-01-15T10:30:00+00:00".to_string()),
            source: Some("BeyondChats".to_string()),
            references: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn search_url(query: &str) -> String {
        format!("https://www.google.com/search?q={}", urlencoding::encode(query))
    }

    fn search_page(urls: &[&str]) -> String {
        urls.iter()
            .map(|url| {
                format!(
                    r#"<div class="g"><a href="{}"><h3>Result</h3></a><span></span></div>"#,
                    url
                )
            })
            .collect()
    }

    fn article_page(chars: usize) -> String {
        format!("<html><body><article>{}</article></body></html>", "r".repeat(chars))
    }

    #[tokio::test]
    async fn test_enhances_with_two_references() {
        let store = Arc::new(MemoryStorage::new());
        let article = original("https://blog.test/scaling", &"c".repeat(500));
        store.create(&article).await.unwrap();

        let ref_a = "https://example.com/blog/a";
        let ref_b = "https://example.com/blog/b";
        let mut pages = HashMap::new();
        pages.insert(search_url(&article.title), search_page(&[ref_a, ref_b]));
        pages.insert(ref_a.to_string(), article_page(250));
        pages.insert(ref_b.to_string(), article_page(300));

        let generator = Arc::new(RecordingGenerator::returning("A better article."));
        let enhancer = Enhancer::new(
            store.clone(),
            generator.clone(),
            Arc::new(MapFetcher { pages }),
        );

        let outcome = enhancer.enhance_article(&article).await.unwrap();
        let stored = match outcome {
            EnhanceOutcome::Enhanced(stored) => stored,
            other => panic!("expected Enhanced, got {:?}", other),
        };

        assert_eq!(stored.version, ArticleVersion::Updated);
        assert_eq!(stored.url, article.url);
        assert_eq!(stored.references, vec![ref_a.to_string(), ref_b.to_string()]);
        let content = stored.content.unwrap();
        assert!(content.starts_with("A better article."));
        let appendix = content.split("## References").nth(1).unwrap();
        let pos_a = appendix.find(ref_a).unwrap();
        let pos_b = appendix.find(ref_b).unwrap();
        assert!(pos_a < pos_b);

        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("Reference Articles"));
        assert!(prompt.contains("Reference Article 2:"));

        // Exactly one updated record in the store.
        let updated = store.list(Some(ArticleVersion::Updated)).await.unwrap();
        assert_eq!(updated.len(), 1);
    }

    #[tokio::test]
    async fn test_already_enhanced_skips_without_generating() {
        let store = Arc::new(MemoryStorage::new());
        let article = original("https://blog.test/scaling", &"c".repeat(500));
        store.create(&article).await.unwrap();
        let mut existing = article.clone();
        existing.version = ArticleVersion::Updated;
        store.create(&existing).await.unwrap();

        let generator = Arc::new(RecordingGenerator::returning("unused"));
        let enhancer = Enhancer::new(
            store,
            generator.clone(),
            Arc::new(MapFetcher {
                pages: HashMap::new(),
            }),
        );

        let outcome = enhancer.enhance_article(&article).await.unwrap();
        assert!(matches!(outcome, EnhanceOutcome::SkippedAlreadyEnhanced));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_partial_reference_set_is_discarded() {
        let store = Arc::new(MemoryStorage::new());
        let article = original("https://blog.test/scaling", &"c".repeat(500));
        store.create(&article).await.unwrap();

        let ref_a = "https://example.com/blog/a";
        let ref_b = "https://example.com/blog/b";
        let mut pages = HashMap::new();
        pages.insert(search_url(&article.title), search_page(&[ref_a, ref_b]));
        // One reference scrapes thin, the other is unreachable.
        pages.insert(ref_a.to_string(), article_page(100));

        let generator = Arc::new(RecordingGenerator::returning("A better article."));
        let enhancer = Enhancer::new(
            store.clone(),
            generator.clone(),
            Arc::new(MapFetcher { pages }),
        );

        let outcome = enhancer.enhance_article(&article).await.unwrap();
        let stored = match outcome {
            EnhanceOutcome::Enhanced(stored) => stored,
            other => panic!("expected Enhanced, got {:?}", other),
        };

        assert!(stored.references.is_empty());
        assert!(!stored.content.unwrap().contains("## References"));
        let prompt = generator.last_prompt().unwrap();
        assert!(!prompt.contains("Reference Articles"));
    }

    #[tokio::test]
    async fn test_insufficient_content_with_unfetchable_url() {
        let store = Arc::new(MemoryStorage::new());
        let article = original("https://blog.test/scaling", "ten chars.");
        store.create(&article).await.unwrap();

        let generator = Arc::new(RecordingGenerator::returning("unused"));
        let enhancer = Enhancer::new(
            store.clone(),
            generator.clone(),
            Arc::new(MapFetcher {
                pages: HashMap::new(),
            }),
        );

        let outcome = enhancer.enhance_article(&article).await.unwrap();
        assert!(matches!(outcome, EnhanceOutcome::SkippedInsufficientContent));
        assert_eq!(generator.call_count(), 0);
        let updated = store.list(Some(ArticleVersion::Updated)).await.unwrap();
        assert!(updated.is_empty());
    }

    #[tokio::test]
    async fn test_content_boundary_50_accepted_49_rejected() {
        let store = Arc::new(MemoryStorage::new());
        let generator = Arc::new(RecordingGenerator::returning("A better article."));
        let enhancer = Enhancer::new(
            store.clone(),
            generator.clone(),
            Arc::new(MapFetcher {
                pages: HashMap::new(),
            }),
        );

        let exact = original("https://blog.test/exact", &"c".repeat(50));
        let outcome = enhancer.enhance_article(&exact).await.unwrap();
        assert!(matches!(outcome, EnhanceOutcome::Enhanced(_)));
        assert_eq!(generator.call_count(), 1);

        let short = original("https://blog.test/short", &"c".repeat(49));
        let outcome = enhancer.enhance_article(&short).await.unwrap();
        assert!(matches!(outcome, EnhanceOutcome::SkippedInsufficientContent));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_refetches_own_url_when_stored_content_short() {
        let store = Arc::new(MemoryStorage::new());
        let article = original("https://blog.test/scaling", "");
        store.create(&article).await.unwrap();

        let mut pages = HashMap::new();
        pages.insert(article.url.clone(), article_page(400));

        let generator = Arc::new(RecordingGenerator::returning("A better article."));
        let enhancer = Enhancer::new(
            store,
            generator.clone(),
            Arc::new(MapFetcher { pages }),
        );

        let outcome = enhancer.enhance_article(&article).await.unwrap();
        assert!(matches!(outcome, EnhanceOutcome::Enhanced(_)));
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains(&"r".repeat(400)));
    }

    #[tokio::test]
    async fn test_generation_failure_writes_nothing() {
        let store = Arc::new(MemoryStorage::new());
        let article = original("https://blog.test/scaling", &"c".repeat(500));
        store.create(&article).await.unwrap();

        let generator = Arc::new(RecordingGenerator::failing());
        let enhancer = Enhancer::new(
            store.clone(),
            generator,
            Arc::new(MapFetcher {
                pages: HashMap::new(),
            }),
        );

        let err = enhancer.enhance_article(&article).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        let updated = store.list(Some(ArticleVersion::Updated)).await.unwrap();
        assert!(updated.is_empty());
    }
}
