use thiserror::Error;

use crate::ArticleVersion;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid article version: {0}")]
    InvalidVersion(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Article already stored: {0} ({1})")]
    AlreadyExists(String, ArticleVersion),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}
