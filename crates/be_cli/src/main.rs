use std::sync::Arc;
use std::time::Duration;

use be_core::{Article, ArticleStore, ArticleVersion, DocumentFetcher, Error, Result};
use be_inference::Config;
use be_scrapers::cli::{handle_command, PipelineArgs, PipelineCommands};
use be_scrapers::fetch::HttpFetcher;
use be_scrapers::listing::{BlogListing, DEFAULT_LISTING_URL, DEFAULT_SOURCE};
use be_scrapers::PipelineManager;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Blog ingestion and enhancement pipeline", long_about = None)]
struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, default_value = "sqlite")]
    storage: String,
    /// SQLite database path
    #[arg(long, default_value = "articles.db")]
    db_path: String,
    /// Generator model: groq or dummy
    #[arg(long, default_value = "groq")]
    model: String,
    /// Groq API key; falls back to the GROQ_API_KEY environment variable
    #[arg(long)]
    api_key: Option<String>,
    /// Blog listing page to ingest from
    #[arg(long)]
    listing_url: Option<String>,
    /// Source label stored on ingested articles
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: String,
    /// Seconds to wait between articles during enhancement
    #[arg(long, default_value_t = 2)]
    delay_secs: u64,
    #[command(subcommand)]
    command: PipelineCommands,
}

async fn check_storage(store: &Arc<dyn ArticleStore>, storage_kind: &str) -> Result<()> {
    let probe = Article {
        id: None,
        title: "Storage probe".to_string(),
        url: "http://test.com/probe".to_string(),
        version: ArticleVersion::Original,
        excerpt: None,
        content: Some("Probe content".to_string()),
        author: None,
        image: None,
        published_at: None,
        source: Some("probe".to_string()),
        references: Vec::new(),
        created_at: None,
        updated_at: None,
    };

    // A leftover probe from an aborted run still proves the store works.
    if let Err(e) = store.create(&probe).await {
        if !matches!(e, Error::AlreadyExists(..)) {
            return Err(e);
        }
    }

    let found = store
        .find_by_url(&probe.url, Some(ArticleVersion::Original))
        .await?
        .ok_or_else(|| Error::Storage("Failed to retrieve probe article".to_string()))?;
    if let Some(id) = found.id {
        if let Err(e) = store.delete(id).await {
            warn!("⚠️ Failed to clean up probe article: {}", e);
        }
    }

    info!("🏦 Storage backend initialized successfully (using {})", storage_kind);
    Ok(())
}

async fn check_storage_with_retry(
    store: &Arc<dyn ArticleStore>,
    storage_kind: &str,
    max_retries: u32,
) -> Result<()> {
    let mut last_error = None;
    for attempt in 1..=max_retries {
        match check_storage(store, storage_kind).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_error = Some(e);
                if attempt < max_retries {
                    info!("Storage health check failed, retrying {}/{}...", attempt, max_retries);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| Error::Storage("Storage health check failed".to_string())))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store = be_storage::create_store(&cli.storage, Some(cli.db_path.as_str())).await?;
    check_storage_with_retry(&store, &cli.storage, 3).await?;

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("GROQ_API_KEY").ok());
    let generator = be_inference::create_generator(Some(Config {
        api_key,
        model_name: Some(cli.model.clone()),
        base_url: None,
    }))?;
    info!("🧠 Generator initialized successfully (using {})", generator.name());

    let fetcher: Arc<dyn DocumentFetcher> = Arc::new(HttpFetcher::new()?);

    let listing_url = cli.listing_url.as_deref().unwrap_or(DEFAULT_LISTING_URL);
    let manager = PipelineManager::new(store, generator, fetcher)
        .with_listing(BlogListing::new(listing_url, &cli.source)?)
        .with_delay(Duration::from_secs(cli.delay_secs));

    handle_command(
        PipelineArgs {
            command: cli.command,
        },
        &manager,
    )
    .await
}
