//! Human-readable relative time.
//!
//! Two registers are used across the app: the abbreviated form shown next to
//! stories and comments ("3h ago") and the full form used in digest prompts
//! ("3 hours ago").

use chrono::{DateTime, Duration, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// "5m ago", "2h ago"
    Abbreviated,
    /// "5 minutes ago", "2 hours ago"
    Full,
}

/// Describe `instant` relative to `now`. Instants in the future are clamped
/// to "just now".
pub fn relative_to(instant: DateTime<Utc>, now: DateTime<Utc>, style: Style) -> String {
    format_elapsed(now.signed_duration_since(instant), style)
}

pub fn format_elapsed(elapsed: Duration, style: Style) -> String {
    let secs = elapsed.num_seconds().max(0);

    let (value, short, long) = if secs < MINUTE {
        return match style {
            Style::Abbreviated => "now".to_string(),
            Style::Full => "just now".to_string(),
        };
    } else if secs < HOUR {
        (secs / MINUTE, "m", "minute")
    } else if secs < DAY {
        (secs / HOUR, "h", "hour")
    } else if secs < WEEK {
        (secs / DAY, "d", "day")
    } else if secs < MONTH {
        (secs / WEEK, "w", "week")
    } else if secs < YEAR {
        (secs / MONTH, "mo", "month")
    } else {
        (secs / YEAR, "y", "year")
    };

    match style {
        Style::Abbreviated => format!("{}{} ago", value, short),
        Style::Full if value == 1 => format!("1 {} ago", long),
        Style::Full => format!("{} {}s ago", value, long),
    }
}
