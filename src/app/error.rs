use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum CatchupError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("No stories available at the moment.")]
    NoStoriesAvailable,

    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CatchupError>;
