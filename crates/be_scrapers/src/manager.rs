use std::sync::Arc;
use std::time::Duration;

use be_core::{
    Article, ArticleStore, ArticleVersion, DocumentFetcher, Error, Result, TextGenerator,
};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::enhance::{EnhanceOutcome, Enhancer};
use crate::extract::extract;
use crate::listing::{BlogListing, ListingCandidate};

/// Fixed pause between generation calls, respecting external rate limits.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub attempted: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhanceSummary {
    pub attempted: usize,
    pub enhanced: usize,
    pub skipped_already_enhanced: usize,
    pub skipped_insufficient_content: usize,
    pub failed: usize,
}

/// Drives the ingestion and enhancement pipelines over a bounded article
/// set, isolating per-item failures so one bad article never aborts the
/// batch. Collaborators are injected once at startup.
pub struct PipelineManager {
    store: Arc<dyn ArticleStore>,
    generator: Arc<dyn TextGenerator>,
    fetcher: Arc<dyn DocumentFetcher>,
    listing: BlogListing,
    delay: Duration,
}

impl PipelineManager {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        generator: Arc<dyn TextGenerator>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            store,
            generator,
            fetcher,
            listing: BlogListing::default(),
            delay: DEFAULT_ITEM_DELAY,
        }
    }

    pub fn with_listing(mut self, listing: BlogListing) -> Self {
        self.listing = listing;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Scrape the listing page and store each candidate as an original
    /// article. Only an unreachable listing source fails the whole run.
    pub async fn run_ingest(&self) -> Result<IngestSummary> {
        info!("🦗 Fetching blog listing: {}", self.listing.url());
        let html = self.fetcher.fetch(self.listing.url()).await?;
        let candidates = self.listing.extract(&html);
        info!("Found {} listing candidates", candidates.len());

        let mut summary = IngestSummary::default();
        for candidate in candidates {
            summary.attempted += 1;
            match self.ingest_candidate(&candidate).await {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.skipped_existing += 1,
                Err(e) => {
                    error!("Failed to ingest {}: {}", candidate.url, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "✨ Ingest run complete: {} created, {} already stored, {} failed",
            summary.created, summary.skipped_existing, summary.failed
        );
        Ok(summary)
    }

    async fn ingest_candidate(&self, candidate: &ListingCandidate) -> Result<bool> {
        if self
            .store
            .find_by_url(&candidate.url, Some(ArticleVersion::Original))
            .await?
            .is_some()
        {
            info!("⏭️ Article already stored, skipping: {}", candidate.url);
            return Ok(false);
        }

        info!("📰 Scraping article content: {}", candidate.url);
        let scraped = match self.fetcher.fetch(&candidate.url).await {
            Ok(html) => extract(&html),
            Err(e) => {
                warn!("Failed to fetch article body from {}: {}", candidate.url, e);
                String::new()
            }
        };
        let content = if scraped.is_empty() {
            candidate.excerpt.clone().unwrap_or_default()
        } else {
            scraped
        };

        let article = Article {
            id: None,
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            version: ArticleVersion::Original,
            excerpt: candidate.excerpt.clone(),
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            author: candidate.author.clone(),
            image: candidate.image.clone(),
            published_at: candidate.published_at.clone(),
            source: Some(self.listing.source().to_string()),
            references: Vec::new(),
            created_at: None,
            updated_at: None,
        };

        match self.store.create(&article).await {
            Ok(_) => Ok(true),
            Err(Error::AlreadyExists(..)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Enhance every stored original. Only a store failure while listing the
    /// batch fails the whole run; everything else is counted per article.
    pub async fn run_enhance(&self) -> Result<EnhanceSummary> {
        let originals = self.store.list(Some(ArticleVersion::Original)).await?;
        let mut summary = EnhanceSummary::default();
        if originals.is_empty() {
            info!("No original articles stored; run ingest first");
            return Ok(summary);
        }
        info!("Found {} articles to enhance", originals.len());

        let enhancer = Enhancer::new(
            self.store.clone(),
            self.generator.clone(),
            self.fetcher.clone(),
        );
        for article in &originals {
            summary.attempted += 1;
            match enhancer.enhance_article(article).await {
                Ok(EnhanceOutcome::Enhanced(_)) => {
                    summary.enhanced += 1;
                    sleep(self.delay).await;
                }
                Ok(EnhanceOutcome::SkippedAlreadyEnhanced) => {
                    summary.skipped_already_enhanced += 1;
                }
                Ok(EnhanceOutcome::SkippedInsufficientContent) => {
                    summary.skipped_insufficient_content += 1;
                }
                Err(e) => {
                    error!("Failed to enhance {}: {}", article.title, e);
                    summary.failed += 1;
                    // The generator was still called; keep pacing.
                    sleep(self.delay).await;
                }
            }
        }

        info!(
            "✨ Enhance run complete: {} enhanced, {} already enhanced, {} too thin, {} failed",
            summary.enhanced,
            summary.skipped_already_enhanced,
            summary.skipped_insufficient_content,
            summary.failed
        );
        Ok(summary)
    }

    pub async fn list_articles(&self, version: Option<ArticleVersion>) -> Result<Vec<Article>> {
        self.store.list(version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use be_inference::DummyGenerator;
    use be_storage::MemoryStorage;
    use std::collections::HashMap;

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

    fn card(path: &str, title: &str, excerpt: &str) -> String {
        format!(
            r#"<article class="entry-card">
            <h2 class="entry-title"><a href="{path}">{title}</a></h2>
            <div class="entry-excerpt"><p>{excerpt}</p></div>
            <div class="meta-author"><a href="/a">Jane Doe</a></div>
            <img src="/img/cover.png">
            <time datetime="2024-01-15T10:30:00+00:00">Jan 15</time>
            </article>"#
        )
    }

    fn article_page(chars: usize) -> String {
        format!(
            "<html><body><article>{}</article></body></html>",
            "r".repeat(chars)
        )
    }

    fn manager(pages: HashMap<String, String>) -> (Arc<MemoryStorage>, PipelineManager) {
        let store = Arc::new(MemoryStorage::new());
        let manager = PipelineManager::new(
            store.clone(),
            Arc::new(DummyGenerator::new()),
            Arc::new(MapFetcher { pages }),
        )
        .with_listing(BlogListing::new("https://blog.test/", "Test Blog").unwrap())
        .with_delay(Duration::ZERO);
        (store, manager)
    }

    #[tokio::test]
    async fn test_ingest_stores_listing_candidate() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://blog.test/".to_string(),
            card("/posts/first/", "First Post", "A fine excerpt about support."),
        );
        pages.insert("https://blog.test/posts/first/".to_string(), article_page(300));

        let (store, manager) = manager(pages);
        let summary = manager.run_ingest().await.unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 0);

        let stored = store
            .find_by_url("https://blog.test/posts/first/", Some(ArticleVersion::Original))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "First Post");
        assert_eq!(stored.excerpt.as_deref(), Some("A fine excerpt about support."));
        assert_eq!(stored.author.as_deref(), Some("Jane Doe"));
        assert_eq!(stored.image.as_deref(), Some("https://blog.test/img/cover.png"));
        assert_eq!(
            stored.published_at.as_deref(),
            Some("2024-01-15T10:30:00+00:00")
        );
        assert_eq!(stored.source.as_deref(), Some("Test Blog"));
        assert_eq!(stored.content.unwrap().len(), 300);
    }

    #[tokio::test]
    async fn test_ingest_is_idempotent() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://blog.test/".to_string(),
            [
                card("/posts/a/", "Post A", "Excerpt for post a."),
                card("/posts/b/", "Post B", "Excerpt for post b."),
            ]
            .join(""),
        );
        pages.insert("https://blog.test/posts/a/".to_string(), article_page(300));
        pages.insert("https://blog.test/posts/b/".to_string(), article_page(300));

        let (store, manager) = manager(pages);
        let first = manager.run_ingest().await.unwrap();
        assert_eq!(first.created, 2);

        let second = manager.run_ingest().await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped_existing, 2);

        let originals = store.list(Some(ArticleVersion::Original)).await.unwrap();
        assert_eq!(originals.len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_falls_back_to_excerpt_when_body_unreachable() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://blog.test/".to_string(),
            card("/posts/a/", "Post A", "Only the excerpt is available."),
        );

        let (store, manager) = manager(pages);
        let summary = manager.run_ingest().await.unwrap();
        assert_eq!(summary.created, 1);

        let stored = store
            .find_by_url("https://blog.test/posts/a/", Some(ArticleVersion::Original))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content.as_deref(), Some("Only the excerpt is available."));
    }

    #[tokio::test]
    async fn test_ingest_fails_when_listing_unreachable() {
        let (_store, manager) = manager(HashMap::new());
        assert!(manager.run_ingest().await.is_err());
    }

    #[tokio::test]
    async fn test_enhance_isolates_per_article_outcomes() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://blog.test/".to_string(),
            [
                card("/posts/long/", "Long Post", "Excerpt."),
                card("/posts/short/", "Short Post", "tiny"),
            ]
            .join(""),
        );
        pages.insert("https://blog.test/posts/long/".to_string(), article_page(400));
        // The short post's body stays unreachable for both runs.

        let (store, manager) = manager(pages);
        manager.run_ingest().await.unwrap();

        let summary = manager.run_enhance().await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.enhanced, 1);
        assert_eq!(summary.skipped_insufficient_content, 1);
        assert_eq!(summary.failed, 0);

        let updated = store.list(Some(ArticleVersion::Updated)).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].url, "https://blog.test/posts/long/");

        // A second run is a no-op for the enhanced article.
        let second = manager.run_enhance().await.unwrap();
        assert_eq!(second.enhanced, 0);
        assert_eq!(second.skipped_already_enhanced, 1);
        assert_eq!(second.skipped_insufficient_content, 1);
        let updated = store.list(Some(ArticleVersion::Updated)).await.unwrap();
        assert_eq!(updated.len(), 1);
    }

    #[tokio::test]
    async fn test_enhance_with_empty_store_is_zero_summary() {
        let (_store, manager) = manager(HashMap::new());
        let summary = manager.run_enhance().await.unwrap();
        assert_eq!(summary, EnhanceSummary::default());
    }
}
