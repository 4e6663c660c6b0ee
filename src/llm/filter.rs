//! Cleanup of raw model output.

use std::sync::OnceLock;

use regex::Regex;

fn reasoning_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?s)<thinking>.*?</thinking>",
            r"(?s)<think>.*?</think>",
            r"(?s)<reasoning>.*?</reasoning>",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn opening_tag() -> Option<&'static Regex> {
    static OPENING: OnceLock<Option<Regex>> = OnceLock::new();
    OPENING
        .get_or_init(|| Regex::new(r"^<([A-Za-z_][A-Za-z0-9_]*)>").ok())
        .as_ref()
}

/// Drop reasoning blocks, trim, and unwrap a tag pair enclosing the whole text.
pub fn filter(text: &str) -> String {
    let mut processed = text.to_string();
    for pattern in reasoning_patterns() {
        processed = pattern.replace_all(&processed, "").into_owned();
    }

    unwrap_outer_tag(processed.trim()).to_string()
}

fn unwrap_outer_tag(text: &str) -> &str {
    let Some(captures) = opening_tag().and_then(|re| re.captures(text)) else {
        return text;
    };
    let (open, tag) = match (captures.get(0), captures.get(1)) {
        (Some(open), Some(tag)) => (open.as_str(), tag.as_str()),
        _ => return text,
    };

    let close = format!("</{}>", tag);
    if text.len() < open.len() + close.len() || !text.ends_with(&close) {
        return text;
    }

    text[open.len()..text.len() - close.len()].trim()
}
