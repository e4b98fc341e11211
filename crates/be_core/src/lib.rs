pub mod error;
pub mod fetch;
pub mod models;
pub mod storage;

pub use error::Error;
pub use fetch::DocumentFetcher;
pub use models::TextGenerator;
pub use storage::{ArticleStore, ArticleUpdate};

pub type Result<T> = std::result::Result<T, Error>;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored article. An `original` row and its `updated` rewrite share a URL
/// but are distinct records; the pair (url, version) is unique in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Assigned by the store on creation, `None` before insert.
    pub id: Option<i64>,
    pub title: String,
    pub url: String,
    pub version: ArticleVersion,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    /// Raw `datetime` attribute from the source page, kept verbatim.
    pub published_at: Option<String>,
    pub source: Option<String>,
    /// Reference URLs consulted during enhancement; empty for originals.
    pub references: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleVersion {
    Original,
    Updated,
}

impl Default for ArticleVersion {
    fn default() -> Self {
        Self::Original
    }
}

impl fmt::Display for ArticleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

impl FromStr for ArticleVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(Self::Original),
            "updated" => Ok(Self::Updated),
            other => Err(Error::InvalidVersion(other.to_string())),
        }
    }
}
