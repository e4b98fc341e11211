use async_trait::async_trait;

use crate::Result;

/// Opaque HTTP document provider. Non-2xx responses and transport failures
/// surface as errors; callers decide whether that aborts their pipeline.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}
