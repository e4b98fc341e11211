use async_trait::async_trait;
use be_core::{Article, ArticleStore, ArticleUpdate, ArticleVersion, Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::sync::Arc;

const MIGRATIONS: &[&str] = &[
    // "references" is reserved in SQL, hence article_references.
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        version TEXT NOT NULL DEFAULT 'original',
        excerpt TEXT,
        content TEXT,
        author TEXT,
        image TEXT,
        published_at TEXT,
        source TEXT,
        article_references TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (url, version)
    )
    "#,
    // Add future migrations here
];

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_article(row: &SqliteRow) -> Article {
    let references = row
        .get::<Option<String>, _>("article_references")
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    Article {
        id: Some(row.get::<i64, _>("id")),
        title: row.get("title"),
        url: row.get("url"),
        version: row.get::<String, _>("version").parse().unwrap_or_default(),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        author: row.get("author"),
        image: row.get("image"),
        published_at: row.get("published_at"),
        source: row.get("source"),
        references,
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    }
}

#[async_trait]
impl ArticleStore for SqliteStorage {
    async fn create(&self, article: &Article) -> Result<Article> {
        let references = if article.references.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&article.references)?)
        };
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (title, url, version, excerpt, content, author, image, published_at, source, article_references, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.url)
        .bind(article.version.to_string())
        .bind(article.excerpt.as_deref())
        .bind(article.content.as_deref())
        .bind(article.author.as_deref())
        .bind(article.image.as_deref())
        .bind(article.published_at.as_deref())
        .bind(article.source.as_deref())
        .bind(references.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(&*self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db))
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                return Err(Error::AlreadyExists(article.url.clone(), article.version));
            }
            Err(e) => return Err(Error::Storage(format!("Failed to store article: {}", e))),
        };

        let id = result.last_insert_rowid();
        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::Storage(format!("Stored article {} not found", id)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to load article {}: {}", id, e)))?;

        Ok(row.as_ref().map(row_to_article))
    }

    async fn find_by_url(
        &self,
        url: &str,
        version: Option<ArticleVersion>,
    ) -> Result<Option<Article>> {
        let row = match version {
            Some(version) => {
                sqlx::query("SELECT * FROM articles WHERE url = ? AND version = ? LIMIT 1")
                    .bind(url)
                    .bind(version.to_string())
                    .fetch_optional(&*self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM articles WHERE url = ? LIMIT 1")
                    .bind(url)
                    .fetch_optional(&*self.pool)
                    .await
            }
        }
        .map_err(|e| Error::Storage(format!("Failed to look up {}: {}", url, e)))?;

        Ok(row.as_ref().map(row_to_article))
    }

    async fn list(&self, version: Option<ArticleVersion>) -> Result<Vec<Article>> {
        let rows = match version {
            Some(version) => {
                sqlx::query(
                    "SELECT * FROM articles WHERE version = ? ORDER BY created_at DESC, id DESC",
                )
                .bind(version.to_string())
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM articles ORDER BY created_at DESC, id DESC")
                    .fetch_all(&*self.pool)
                    .await
            }
        }
        .map_err(|e| Error::Storage(format!("Failed to list articles: {}", e)))?;

        Ok(rows.iter().map(row_to_article).collect())
    }

    async fn update(&self, id: i64, fields: ArticleUpdate) -> Result<Option<Article>> {
        let existing = match self.find_by_id(id).await? {
            Some(existing) => existing,
            None => return Ok(None),
        };

        sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, excerpt = ?, content = ?, author = ?,
                image = ?, published_at = ?, source = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.title.unwrap_or(existing.title))
        .bind(fields.excerpt.or(existing.excerpt))
        .bind(fields.content.or(existing.content))
        .bind(fields.author.or(existing.author))
        .bind(fields.image.or(existing.image))
        .bind(fields.published_at.or(existing.published_at))
        .bind(fields.source.or(existing.source))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to update article {}: {}", id, e)))?;

        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete article {}: {}", id, e)))?;

        Ok(result.rows_affected() > 0)
    }
}
