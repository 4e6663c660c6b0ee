use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::domain::Story;

const INSTRUCTIONS: &str = "\nProvide a concise catch-up summary:
- Start with a brief greeting acknowledging the time away (e.g., \"Since you've been away...\" or \"Welcome! Here's what's trending...\")
- List the 3-5 most important/interesting things happening
- Use bullet points with brief explanations
- Focus on: major announcements, trending discussions, notable launches
- Keep it conversational and scannable";

/// Opening sentence, chosen by whether this is the first visit and whether
/// anything was posted since the last one.
fn context_intro(last_visit: Option<DateTime<Utc>>, elapsed: &str, has_new_stories: bool) -> String {
    match last_visit {
        None => "This is the user's first time using the app. Give them a warm welcome and summarize what's currently trending on Hacker News.".to_string(),
        Some(_) if has_new_stories => format!(
            "The user last checked Hacker News {}. Summarize what they missed.",
            elapsed
        ),
        Some(_) => format!(
            "The user last checked Hacker News {}. There are no major new stories since then, but here's what's currently trending. Let them know nothing big happened but share what's popular right now.",
            elapsed
        ),
    }
}

/// Build the digest prompt for `stories`, listing at most `limit` of them.
pub fn build_prompt(
    stories: &[Story],
    last_visit: Option<DateTime<Utc>>,
    elapsed: &str,
    has_new_stories: bool,
    limit: usize,
    now: DateTime<Utc>,
) -> String {
    let mut prompt = format!(
        "You are a helpful tech news assistant. {}\n\nCurrent top Hacker News stories:\n\n",
        context_intro(last_visit, elapsed, has_new_stories)
    );

    for (rank, story) in stories.iter().take(limit).enumerate() {
        let domain = story.domain().unwrap_or_else(|| "self".to_string());
        let _ = writeln!(
            prompt,
            "{}. [Score: {}, {}] \"{}\" ({})",
            rank + 1,
            story.score,
            story.relative_time(now),
            story.title,
            domain
        );
    }

    prompt.push_str(INSTRUCTIONS);
    prompt
}
