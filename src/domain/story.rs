use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::time::{self, Style};

pub const STORY_TYPE: &str = "story";

/// A ranked submission as served by `/item/{id}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub title: String,
    #[serde(rename = "by")]
    pub author: String,
    pub score: i64,
    pub time: i64,
    #[serde(default)]
    pub descendants: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub kids: Option<Vec<i64>>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Story {
    pub fn is_story(&self) -> bool {
        self.kind == STORY_TYPE
    }

    pub fn posted_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.time, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn relative_time(&self, now: DateTime<Utc>) -> String {
        time::relative_to(self.posted_at(), now, Style::Abbreviated)
    }

    /// Host of the external link without a leading `www.` label.
    pub fn domain(&self) -> Option<String> {
        let url = Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }

    pub fn is_from_today(&self) -> bool {
        self.posted_at().with_timezone(&Local).date_naive() == Local::now().date_naive()
    }

    pub fn comment_count(&self) -> i64 {
        self.descendants.unwrap_or(0)
    }

    pub fn comment_ids(&self) -> &[i64] {
        self.kids.as_deref().unwrap_or(&[])
    }

    /// Link to open for this story: the external URL, or the discussion page
    /// for self posts.
    pub fn display_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", self.id))
    }
}
