use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Story;

/// Result of one digest cycle.
///
/// `summary` is `None` only for the "all caught up" variant, in which case
/// `stories` is empty as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchUpSummary {
    pub summary: Option<String>,
    pub story_count: usize,
    pub last_visit: Option<DateTime<Utc>>,
    pub time_since_last_visit: String,
    pub has_new_stories: bool,
    pub is_all_caught_up: bool,
    pub generated_at: DateTime<Utc>,
    pub stories: Vec<Story>,
}

impl CatchUpSummary {
    pub fn all_caught_up(last_visit: DateTime<Utc>, time_since_last_visit: String) -> Self {
        Self {
            summary: None,
            story_count: 0,
            last_visit: Some(last_visit),
            time_since_last_visit,
            has_new_stories: false,
            is_all_caught_up: true,
            generated_at: Utc::now(),
            stories: Vec::new(),
        }
    }

    pub fn is_first_visit(&self) -> bool {
        self.last_visit.is_none()
    }
}
