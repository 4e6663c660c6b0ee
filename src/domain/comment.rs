use chrono::{DateTime, TimeZone, Utc};
use html_escape::decode_html_entities;
use serde::{Deserialize, Serialize};

use super::time::{self, Style};

pub const COMMENT_TYPE: &str = "comment";
pub const DELETED: &str = "[deleted]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "by", default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    pub time: i64,
    pub parent: i64,
    #[serde(default)]
    pub kids: Option<Vec<i64>>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Comment {
    pub fn is_comment(&self) -> bool {
        self.kind == COMMENT_TYPE
    }

    pub fn author(&self) -> &str {
        self.author.as_deref().unwrap_or(DELETED)
    }

    /// Raw body as served (HTML fragment).
    pub fn content(&self) -> &str {
        self.text.as_deref().unwrap_or(DELETED)
    }

    /// Body with paragraph tags turned into blank lines and entities decoded.
    pub fn plain_text(&self) -> String {
        let body = self.content().replace("<p>", "\n\n").replace("</p>", "");
        decode_html_entities(&body).trim().to_string()
    }

    pub fn child_ids(&self) -> &[i64] {
        self.kids.as_deref().unwrap_or(&[])
    }

    pub fn child_count(&self) -> usize {
        self.child_ids().len()
    }

    pub fn posted_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.time, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn relative_time(&self, now: DateTime<Utc>) -> String {
        time::relative_to(self.posted_at(), now, Style::Abbreviated)
    }
}
