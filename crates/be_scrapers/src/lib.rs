pub mod cli;
pub mod enhance;
pub mod extract;
pub mod fetch;
pub mod listing;
pub mod manager;
pub mod search;

pub use manager::PipelineManager;

pub mod prelude {
    pub use super::extract::extract;
    pub use super::fetch::HttpFetcher;
    pub use super::listing::BlogListing;
    pub use super::manager::PipelineManager;
    pub use be_core::{Article, Error, Result};
}
