use async_trait::async_trait;
use be_core::{Article, ArticleStore, ArticleUpdate, ArticleVersion, Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

struct MemoryStore {
    articles: Vec<Article>,
    next_id: i64,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            articles: Vec::new(),
            next_id: 1,
        }
    }

    fn create(&mut self, article: &Article) -> Result<Article> {
        if self
            .articles
            .iter()
            .any(|a| a.url == article.url && a.version == article.version)
        {
            return Err(Error::AlreadyExists(article.url.clone(), article.version));
        }

        let now = Utc::now();
        let mut stored = article.clone();
        stored.id = Some(self.next_id);
        stored.created_at = Some(now);
        stored.updated_at = Some(now);
        self.next_id += 1;
        self.articles.push(stored.clone());
        Ok(stored)
    }

    fn find_by_id(&self, id: i64) -> Option<Article> {
        self.articles.iter().find(|a| a.id == Some(id)).cloned()
    }

    fn find_by_url(&self, url: &str, version: Option<ArticleVersion>) -> Option<Article> {
        self.articles
            .iter()
            .find(|a| a.url == url && version.map_or(true, |v| a.version == v))
            .cloned()
    }

    fn list(&self, version: Option<ArticleVersion>) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| version.map_or(true, |v| a.version == v))
            .cloned()
            .collect();
        // Newest-created first; id breaks same-instant ties.
        articles.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        articles
    }

    fn update(&mut self, id: i64, fields: ArticleUpdate) -> Option<Article> {
        let article = self.articles.iter_mut().find(|a| a.id == Some(id))?;
        if let Some(title) = fields.title {
            article.title = title;
        }
        if let Some(excerpt) = fields.excerpt {
            article.excerpt = Some(excerpt);
        }
        if let Some(content) = fields.content {
            article.content = Some(content);
        }
        if let Some(author) = fields.author {
            article.author = Some(author);
        }
        if let Some(image) = fields.image {
            article.image = Some(image);
        }
        if let Some(published_at) = fields.published_at {
            article.published_at = Some(published_at);
        }
        if let Some(source) = fields.source {
            article.source = Some(source);
        }
        article.updated_at = Some(Utc::now());
        Some(article.clone())
    }

    fn delete(&mut self, id: i64) -> bool {
        let before = self.articles.len();
        self.articles.retain(|a| a.id != Some(id));
        self.articles.len() < before
    }
}

pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn create(&self, article: &Article) -> Result<Article> {
        let mut store = self.store.write().await;
        store.create(article)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.find_by_id(id))
    }

    async fn find_by_url(
        &self,
        url: &str,
        version: Option<ArticleVersion>,
    ) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.find_by_url(url, version))
    }

    async fn list(&self, version: Option<ArticleVersion>) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.list(version))
    }

    async fn update(&self, id: i64, fields: ArticleUpdate) -> Result<Option<Article>> {
        let mut store = self.store.write().await;
        Ok(store.update(id, fields))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.delete(id))
    }
}
