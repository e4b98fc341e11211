use std::sync::Arc;

use be_core::{Error, Result, TextGenerator};

use crate::Config;

pub mod dummy;
pub mod groq;

/// Build a generator from its CLI name. Groq is the default.
pub fn create_generator(config: Option<Config>) -> Result<Arc<dyn TextGenerator>> {
    let config = config.unwrap_or_default();
    match config.model_name.as_deref() {
        None | Some("groq") => Ok(Arc::new(groq::GroqGenerator::new(
            config.api_key,
            config.base_url,
        )?)),
        Some("dummy") => Ok(Arc::new(dummy::DummyGenerator::new())),
        Some(other) => Err(Error::Generation(format!(
            "Unknown generator model: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_generator_by_name() {
        let dummy = create_generator(Some(Config {
            model_name: Some("dummy".to_string()),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(dummy.name(), "Dummy");

        let unknown = create_generator(Some(Config {
            model_name: Some("other".to_string()),
            ..Default::default()
        }));
        assert!(unknown.is_err());
    }
}
