use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hn_catchup::app::AppContext;
use hn_catchup::cli::{commands, Cli, Commands};
use hn_catchup::config::Config;
use hn_catchup::source::ListKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
    }

    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Top { limit, offset } => {
            commands::list_stories(&ctx, ListKind::Top, offset, limit).await?;
        }
        Commands::New { limit, offset } => {
            commands::list_stories(&ctx, ListKind::New, offset, limit).await?;
        }
        Commands::Trending { limit } => {
            commands::list_trending(&ctx, limit).await?;
        }
        Commands::Comments {
            story_id,
            offset,
            limit,
            depth,
        } => {
            commands::show_comments(&ctx, story_id, offset, limit, depth).await?;
        }
        Commands::Digest { force, bypass } => {
            commands::show_digest(&ctx, force, bypass).await?;
        }
        Commands::MarkRead => {
            commands::mark_read(&ctx).await?;
        }
        Commands::LastVisit => {
            commands::last_visit(&ctx).await?;
        }
        Commands::Providers => {
            commands::list_providers(&ctx).await?;
        }
    }

    Ok(())
}
