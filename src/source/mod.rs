pub mod http;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{Comment, Story};

pub use http::HttpItemSource;

/// Which ranked id list to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Top,
    New,
}

impl ListKind {
    pub fn path(self) -> &'static str {
        match self {
            ListKind::Top => "topstories.json",
            ListKind::New => "newstories.json",
        }
    }
}

/// Per-item access to the remote forum. One round-trip per call, no caching.
///
/// `Ok(None)` means the item was reachable but is not of the requested type
/// or could not be decoded. Transport failures are `Err`.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_id_list(&self, kind: ListKind) -> Result<Vec<i64>>;

    async fn fetch_story(&self, id: i64) -> Result<Option<Story>>;

    async fn fetch_comment(&self, id: i64) -> Result<Option<Comment>>;
}

pub(crate) fn decode_id_list(body: &[u8]) -> Result<Vec<i64>> {
    Ok(serde_json::from_slice(body)?)
}

pub(crate) fn decode_story(body: &[u8]) -> Option<Story> {
    serde_json::from_slice::<Story>(body)
        .ok()
        .filter(Story::is_story)
}

pub(crate) fn decode_comment(body: &[u8]) -> Option<Comment> {
    serde_json::from_slice::<Comment>(body)
        .ok()
        .filter(Comment::is_comment)
}
