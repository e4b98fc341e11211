use async_trait::async_trait;

use crate::{Article, ArticleVersion, Result};

/// Partial update for metadata corrections. `None` leaves a field unchanged.
/// The (url, version) key is not updatable.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<String>,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article and return the stored row with its id and
    /// timestamps filled in. Fails with `Error::AlreadyExists` when a row
    /// with the same (url, version) is present.
    async fn create(&self, article: &Article) -> Result<Article>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Find an article by URL, optionally constrained to one version.
    async fn find_by_url(&self, url: &str, version: Option<ArticleVersion>)
        -> Result<Option<Article>>;

    /// List stored articles, newest-created first.
    async fn list(&self, version: Option<ArticleVersion>) -> Result<Vec<Article>>;

    /// Apply a partial update; `None` if no row has this id.
    async fn update(&self, id: i64, fields: ArticleUpdate) -> Result<Option<Article>>;

    /// Returns true iff a row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}
