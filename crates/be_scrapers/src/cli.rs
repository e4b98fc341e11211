use clap::{Args, Subcommand};

use be_core::{ArticleVersion, Result};

use crate::manager::PipelineManager;

#[derive(Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub command: PipelineCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PipelineCommands {
    /// Scrape the blog listing and store original articles
    Ingest,
    /// Rewrite stored originals through the text generator
    Enhance,
    /// List stored articles
    List {
        /// Filter by version: original or updated
        #[arg(long)]
        version: Option<String>,
    },
}

pub async fn handle_command(args: PipelineArgs, manager: &PipelineManager) -> Result<()> {
    match args.command {
        PipelineCommands::Ingest => {
            let summary = manager.run_ingest().await?;
            println!(
                "Ingest complete: {} attempted, {} created, {} already stored, {} failed",
                summary.attempted, summary.created, summary.skipped_existing, summary.failed
            );
        }
        PipelineCommands::Enhance => {
            let summary = manager.run_enhance().await?;
            println!(
                "Enhance complete: {} attempted, {} enhanced, {} already enhanced, {} too thin, {} failed",
                summary.attempted,
                summary.enhanced,
                summary.skipped_already_enhanced,
                summary.skipped_insufficient_content,
                summary.failed
            );
        }
        PipelineCommands::List { version } => {
            let version = match version {
                Some(raw) => Some(raw.parse::<ArticleVersion>()?),
                None => None,
            };
            let articles = manager.list_articles(version).await?;
            for article in &articles {
                println!(
                    "#{} [{}] {} - {}",
                    article.id.unwrap_or_default(),
                    article.version,
                    article.title,
                    article.url
                );
            }
            println!("{} article(s)", articles.len());
        }
    }
    Ok(())
}
