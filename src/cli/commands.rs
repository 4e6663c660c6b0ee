use std::io::Write;

use chrono::{DateTime, Local, Utc};

use crate::app::{AppContext, Result};
use crate::domain::{CatchUpSummary, CommentNode, Story};
use crate::fetcher::StoryOrder;
use crate::llm::{Provider, MODEL_CATALOG};
use crate::source::ListKind;

pub async fn list_stories(
    ctx: &AppContext,
    kind: ListKind,
    offset: usize,
    limit: Option<usize>,
) -> Result<()> {
    let page_size = limit.unwrap_or(ctx.config.feed.page_size);
    let stories = ctx
        .fetcher
        .fetch_story_page(kind, offset, page_size, StoryOrder::Ranked)
        .await?;

    print_stories(&stories, offset);
    Ok(())
}

pub async fn list_trending(ctx: &AppContext, limit: Option<usize>) -> Result<()> {
    let page_size = limit.unwrap_or(ctx.config.feed.page_size);
    let stories = ctx
        .fetcher
        .fetch_story_page(ListKind::Top, 0, page_size, StoryOrder::ByScore)
        .await?;

    print_stories(&stories, 0);
    Ok(())
}

fn print_stories(stories: &[Story], offset: usize) {
    if stories.is_empty() {
        println!("No stories");
        return;
    }

    let now = Utc::now();
    for (i, story) in stories.iter().enumerate() {
        println!("{}", story_line(story, offset + i + 1, now));
    }
}

fn story_line(story: &Story, rank: usize, now: DateTime<Utc>) -> String {
    let domain = story
        .domain()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();
    let today = if story.is_from_today() { "" } else { " *" };

    format!(
        "{:>3}. {}{}\n     {} points by {} {}{} | {} comments | id {}",
        rank,
        story.title,
        domain,
        story.score,
        story.author,
        story.relative_time(now),
        today,
        story.comment_count(),
        story.id
    )
}

pub async fn show_comments(
    ctx: &AppContext,
    story_id: i64,
    offset: usize,
    limit: Option<usize>,
    depth: Option<usize>,
) -> Result<()> {
    let story = ctx.fetcher.fetch_story_by_id(story_id).await?;
    let page_size = limit.unwrap_or(ctx.config.comments.page_size);
    let max_depth = depth.unwrap_or(ctx.config.comments.max_depth);

    println!("{}", story.title);
    println!("{}", story.display_url());
    if let Some(text) = story.text.as_deref() {
        println!("\n{}", html_escape::decode_html_entities(text));
    }

    let total = story.comment_ids().len();
    if total == 0 {
        println!("\nNo comments");
        return Ok(());
    }

    let tree = ctx
        .fetcher
        .fetch_comment_page(&story, offset, page_size, max_depth)
        .await?;

    let now = Utc::now();
    for node in CommentNode::flatten_visible(&tree) {
        println!();
        print!("{}", comment_block(node, now));
    }

    let shown = (offset + page_size).min(total);
    if shown < total {
        println!(
            "\n{} of {} threads shown. Next page: --offset {}",
            shown, total, shown
        );
    }
    Ok(())
}

fn comment_block(node: &CommentNode, now: DateTime<Utc>) -> String {
    let indent = "  ".repeat(node.depth);
    let comment = &node.comment;

    let mut out = format!(
        "{}{} {}",
        indent,
        comment.author(),
        comment.relative_time(now)
    );
    if node.has_children() {
        out.push_str(&format!(" [{} replies]", node.descendant_count()));
    }
    out.push('\n');

    for line in comment.plain_text().lines() {
        out.push_str(&indent);
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub async fn show_digest(ctx: &AppContext, force: bool, bypass: bool) -> Result<()> {
    let progress = (ctx.config.llm.provider == Provider::Local).then(|| {
        ctx.digest.on_download_progress(|fraction| {
            eprint!("\rDownloading model... {:>3.0}%", fraction * 100.0);
            if fraction >= 1.0 {
                eprintln!();
            }
            let _ = std::io::stderr().flush();
        })
    });

    let result = ctx.digest.generate_digest(force, bypass).await;
    if let Some(handle) = progress {
        handle.abort();
    }

    print!("{}", render_digest(&result?));
    Ok(())
}

fn render_digest(summary: &CatchUpSummary) -> String {
    if summary.is_all_caught_up {
        return format!(
            "You're all caught up!\nLast visit: {}. Run with --bypass to summarize anyway.\n",
            summary.time_since_last_visit
        );
    }

    let heading = if summary.is_first_visit() {
        "Welcome to Hacker News".to_string()
    } else if summary.has_new_stories {
        format!("Since your last visit {}", summary.time_since_last_visit)
    } else {
        format!(
            "Nothing major since {}, here's what's trending",
            summary.time_since_last_visit
        )
    };

    format!(
        "{}\n\n{}\n\nBased on {} stories, generated {}.\nRun `hn-catchup mark-read` when you're done.\n",
        heading,
        summary.summary.as_deref().unwrap_or_default(),
        summary.story_count,
        summary.generated_at.with_timezone(&Local).format("%H:%M")
    )
}

pub async fn mark_read(ctx: &AppContext) -> Result<()> {
    let visited = ctx.digest.mark_as_read().await?;
    println!(
        "Marked as read at {}",
        visited.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

pub async fn last_visit(ctx: &AppContext) -> Result<()> {
    let snapshot = ctx.visits.snapshot().await?;
    match snapshot.last_visit {
        Some(visit) => println!(
            "Last visit: {} ({})",
            snapshot.description,
            visit.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("No visits yet, the next digest will be {}", snapshot.description),
    }
    Ok(())
}

pub async fn list_providers(ctx: &AppContext) -> Result<()> {
    let llm = &ctx.config.llm;

    println!("Providers:");
    for provider in Provider::ALL {
        let marker = if provider == llm.provider { "*" } else { " " };
        let key_note = match (provider.requires_api_key(), llm.is_anthropic_configured()) {
            (true, true) => " (API key set)",
            (true, false) => " (API key missing)",
            _ => "",
        };
        println!(
            "{} {:<10} {}{}\n    {}",
            marker,
            provider.as_str(),
            provider.display_name(),
            key_note,
            provider.description()
        );
    }

    println!("\nLocal models:");
    for option in MODEL_CATALOG {
        let marker = if option.id == llm.local_model_id { "*" } else { " " };
        let loaded = if ctx.generator.local_models().is_loaded(option.id).await {
            " [loaded]"
        } else {
            ""
        };
        println!(
            "{} {} ({}, {}){}\n    {}",
            marker, option.display_name, option.size, option.id, loaded, option.description
        );
    }
    Ok(())
}
