pub mod models;

pub use models::create_generator;
pub use models::dummy::DummyGenerator;
pub use models::groq::GroqGenerator;

/// Generator wiring, filled in from CLI flags and the environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
}

pub mod prelude {
    pub use super::models::create_generator;
    pub use super::Config;
    pub use be_core::{Result, TextGenerator};
}
