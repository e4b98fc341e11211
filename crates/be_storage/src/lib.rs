use std::sync::Arc;

use be_core::{ArticleStore, Error, Result};
use tracing::info;

pub mod backends;

pub use backends::memory::MemoryStorage;
#[cfg(feature = "sqlite")]
pub use backends::sqlite::SqliteStorage;

/// Build a store from its CLI name. `db_path` only applies to file-backed
/// backends.
pub async fn create_store(kind: &str, db_path: Option<&str>) -> Result<Arc<dyn ArticleStore>> {
    info!("💾 Initializing {} article store", kind);
    match kind {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = db_path.unwrap_or("articles.db");
            let storage = SqliteStorage::new_with_path(std::path::Path::new(path)).await?;
            Ok(Arc::new(storage))
        }
        other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::memory::MemoryStorage;
    pub use super::create_store;
    pub use be_core::{Article, ArticleStore, ArticleVersion, Result};
}
