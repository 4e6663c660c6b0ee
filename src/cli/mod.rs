pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::llm::Provider;

#[derive(Parser)]
#[command(name = "hn-catchup", version)]
#[command(about = "Catch up on Hacker News since your last visit", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/hn-catchup/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (default: <data dir>/hn-catchup/hn-catchup.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Generation provider for this run: on_device, local or anthropic
    #[arg(long, global = true)]
    pub provider: Option<Provider>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List top stories in ranked order
    Top {
        /// Stories per page (default: feed.page_size)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip this many stories
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// List the newest stories
    New {
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// List top stories ordered by score
    Trending {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show the comment tree of a story
    Comments {
        /// Story id
        story_id: i64,

        /// Skip this many top-level comments
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Top-level comments to show (default: comments.page_size)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Deepest reply level to fetch (default: comments.max_depth)
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Summarize what happened since the last visit
    Digest {
        /// Ignore a recently generated digest
        #[arg(long)]
        force: bool,

        /// Summarize even if the last visit was recent
        #[arg(long)]
        bypass: bool,
    },
    /// Mark the digest as read and start a new visit
    MarkRead,
    /// Show when the digest was last marked as read
    LastVisit,
    /// List generation providers and local models
    Providers,
}
