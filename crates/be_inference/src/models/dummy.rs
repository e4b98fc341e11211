use std::fmt;

use async_trait::async_trait;
use be_core::{Result, TextGenerator};

/// Offline stand-in for the generation service; echoes the tail of the
/// prompt. Needs no API key.
pub struct DummyGenerator;

impl DummyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyGenerator").finish()
    }
}

#[async_trait]
impl TextGenerator for DummyGenerator {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        // Take the last 200 words so the output resembles a rewritten body.
        let words: Vec<&str> = prompt.split_whitespace().collect();
        let tail = words.len().saturating_sub(200);
        Ok(format!("[dummy rewrite] {}", words[tail..].join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_generates_non_empty() {
        let generator = DummyGenerator::new();
        let output = generator.generate("Rewrite this article.").await.unwrap();
        assert!(output.starts_with("[dummy rewrite]"));
        assert!(output.contains("Rewrite this article."));
    }
}
