use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::config::ApiConfig;
use crate::domain::{Comment, Story};
use crate::source::{decode_comment, decode_id_list, decode_story, ItemSource, ListKind};

/// reqwest-backed client for the Firebase item API.
pub struct HttpItemSource {
    client: Client,
    base_url: String,
}

impl HttpItemSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        response.error_for_status_ref()?;
        Ok(response.bytes().await?.to_vec())
    }

    fn item_path(id: i64) -> String {
        format!("item/{}.json", id)
    }
}

#[async_trait]
impl ItemSource for HttpItemSource {
    async fn fetch_id_list(&self, kind: ListKind) -> Result<Vec<i64>> {
        let body = self.get(kind.path()).await?;
        let ids = decode_id_list(&body)?;
        tracing::debug!("Fetched {} ids from {}", ids.len(), kind.path());
        Ok(ids)
    }

    async fn fetch_story(&self, id: i64) -> Result<Option<Story>> {
        let body = self.get(&Self::item_path(id)).await?;
        let story = decode_story(&body);
        if story.is_none() {
            tracing::debug!("Item {} is not a story, skipping", id);
        }
        Ok(story)
    }

    async fn fetch_comment(&self, id: i64) -> Result<Option<Comment>> {
        let body = self.get(&Self::item_path(id)).await?;
        let comment = decode_comment(&body);
        if comment.is_none() {
            tracing::debug!("Item {} is not a comment, skipping", id);
        }
        Ok(comment)
    }
}
