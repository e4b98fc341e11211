use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Produce generated text for the given prompt. Empty output is treated
    /// as an error.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
