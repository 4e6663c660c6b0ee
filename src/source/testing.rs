//! In-memory `ItemSource` for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::app::{CatchupError, Result};
use crate::domain::{Comment, Story};
use crate::source::{decode_comment, decode_story, ItemSource, ListKind};

#[derive(Default)]
pub struct MemorySource {
    top: Vec<i64>,
    new: Vec<i64>,
    items: HashMap<i64, Vec<u8>>,
    delays: HashMap<i64, Duration>,
    failing: HashSet<i64>,
    pub item_requests: AtomicUsize,
    pub list_requests: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top(mut self, ids: Vec<i64>) -> Self {
        self.top = ids;
        self
    }

    pub fn with_new(mut self, ids: Vec<i64>) -> Self {
        self.new = ids;
        self
    }

    pub fn with_raw(mut self, id: i64, body: &str) -> Self {
        self.items.insert(id, body.as_bytes().to_vec());
        self
    }

    pub fn with_story(self, id: i64, score: i64, posted: DateTime<Utc>) -> Self {
        let body = json!({
            "id": id,
            "title": format!("Story {}", id),
            "by": "author",
            "score": score,
            "time": posted.timestamp(),
            "descendants": 0,
            "url": format!("https://www.example{}.com/post", id),
            "type": "story",
        });
        self.with_raw(id, &body.to_string())
    }

    pub fn with_comment(self, id: i64, parent: i64, kids: &[i64]) -> Self {
        let body = json!({
            "id": id,
            "by": "commenter",
            "text": format!("comment {}", id),
            "time": 1_700_000_000,
            "parent": parent,
            "kids": kids,
            "type": "comment",
        });
        self.with_raw(id, &body.to_string())
    }

    /// Make the fetch of `id` take `delay` before completing.
    pub fn with_delay(mut self, id: i64, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    /// Make the fetch of `id` fail like a dropped connection.
    pub fn with_failure(mut self, id: i64) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn item_requests(&self) -> usize {
        self.item_requests.load(Ordering::SeqCst)
    }

    pub fn list_requests(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    async fn body(&self, id: i64) -> Result<Vec<u8>> {
        self.item_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&id) {
            return Err(CatchupError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                format!("connection reset fetching {}", id),
            )));
        }
        Ok(self.items.get(&id).cloned().unwrap_or_else(|| b"null".to_vec()))
    }
}

#[async_trait]
impl ItemSource for MemorySource {
    async fn fetch_id_list(&self, kind: ListKind) -> Result<Vec<i64>> {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        Ok(match kind {
            ListKind::Top => self.top.clone(),
            ListKind::New => self.new.clone(),
        })
    }

    async fn fetch_story(&self, id: i64) -> Result<Option<Story>> {
        Ok(decode_story(&self.body(id).await?))
    }

    async fn fetch_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(decode_comment(&self.body(id).await?))
    }
}
