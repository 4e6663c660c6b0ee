use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{try_join_all, BoxFuture};
use futures::stream::{FuturesUnordered, TryStreamExt};
use futures::FutureExt;

use crate::app::{CatchupError, Result};
use crate::domain::{Comment, CommentNode, Story};
use crate::fetcher::{StoryOrder, MAX_RECENCY_WINDOW, RECENCY_OVERFETCH};
use crate::source::{ItemSource, ListKind};

pub struct HierarchicalFetcher {
    source: Arc<dyn ItemSource>,
}

impl HierarchicalFetcher {
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self { source }
    }

    pub async fn fetch_id_list(&self, kind: ListKind) -> Result<Vec<i64>> {
        self.source.fetch_id_list(kind).await
    }

    pub async fn fetch_story_by_id(&self, id: i64) -> Result<Story> {
        self.source
            .fetch_story(id)
            .await?
            .ok_or(CatchupError::ItemNotFound(id))
    }

    /// Fetch the first `limit` ids concurrently.
    ///
    /// The limit applies to the requested ids, not to the admitted stories, so
    /// fewer than `limit` stories come back when some ids are filtered out.
    pub async fn fetch_stories(
        &self,
        ids: &[i64],
        limit: usize,
        order: StoryOrder,
    ) -> Result<Vec<Story>> {
        let requested = &ids[..ids.len().min(limit)];
        let source = self.source.as_ref();

        let mut pending: FuturesUnordered<_> = requested
            .iter()
            .copied()
            .enumerate()
            .map(|(index, id)| async move {
                source.fetch_story(id).await.map(|story| (index, story))
            })
            .collect();

        let mut indexed = Vec::with_capacity(requested.len());
        while let Some((index, story)) = pending.try_next().await? {
            if let Some(story) = story {
                indexed.push((index, story));
            }
        }

        match order {
            StoryOrder::Ranked => indexed.sort_by_key(|(index, _)| *index),
            StoryOrder::ByScore => indexed.sort_by(|(ia, a), (ib, b)| {
                b.score.cmp(&a.score).then(ia.cmp(ib))
            }),
        }

        tracing::debug!(
            "Fetched {} of {} requested stories",
            indexed.len(),
            requested.len()
        );

        Ok(indexed.into_iter().map(|(_, story)| story).collect())
    }

    /// One page of a ranked list, e.g. for "load more" in a feed view.
    pub async fn fetch_story_page(
        &self,
        kind: ListKind,
        offset: usize,
        page_size: usize,
        order: StoryOrder,
    ) -> Result<Vec<Story>> {
        let ids = self.fetch_id_list(kind).await?;
        let page: Vec<i64> = ids.into_iter().skip(offset).take(page_size).collect();
        self.fetch_stories(&page, page_size, order).await
    }

    /// Top stories posted after `since`.
    ///
    /// With no `since`, returns the first `limit` top stories. When nothing in
    /// the window postdates `since`, falls back to the unfiltered top stories
    /// instead of returning an empty list.
    pub async fn fetch_stories_since(
        &self,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Story>> {
        let ids = self.fetch_id_list(ListKind::Top).await?;
        let window = limit.saturating_mul(RECENCY_OVERFETCH).min(MAX_RECENCY_WINDOW);
        let mut stories = self.fetch_stories(&ids, window, StoryOrder::Ranked).await?;

        let Some(since) = since else {
            stories.truncate(limit);
            return Ok(stories);
        };

        let recent: Vec<Story> = stories
            .iter()
            .filter(|story| story.posted_at() > since)
            .take(limit)
            .cloned()
            .collect();

        if recent.is_empty() {
            tracing::info!("No stories posted since {}, using current top stories", since);
            stories.truncate(limit);
            return Ok(stories);
        }

        Ok(recent)
    }

    /// Fetch comments concurrently, returned in the order of `ids`.
    pub async fn fetch_comments(&self, ids: &[i64]) -> Result<Vec<Comment>> {
        let source = self.source.as_ref();

        let mut pending: FuturesUnordered<_> = ids
            .iter()
            .copied()
            .enumerate()
            .map(|(index, id)| async move {
                source.fetch_comment(id).await.map(|comment| (index, comment))
            })
            .collect();

        let mut indexed = Vec::with_capacity(ids.len());
        while let Some((index, comment)) = pending.try_next().await? {
            if let Some(comment) = comment {
                indexed.push((index, comment));
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed.into_iter().map(|(_, comment)| comment).collect())
    }

    /// Expand `ids` into comment trees rooted at `depth`.
    ///
    /// Levels deeper than `max_depth` are never fetched; their subtrees are
    /// simply absent from the result.
    pub async fn fetch_comment_tree(
        &self,
        ids: &[i64],
        depth: usize,
        max_depth: usize,
    ) -> Result<Vec<CommentNode>> {
        self.expand(ids.to_vec(), depth, max_depth).await
    }

    /// Trees for one page of a story's top-level comments.
    pub async fn fetch_comment_page(
        &self,
        story: &Story,
        offset: usize,
        page_size: usize,
        max_depth: usize,
    ) -> Result<Vec<CommentNode>> {
        let page: Vec<i64> = story
            .comment_ids()
            .iter()
            .copied()
            .skip(offset)
            .take(page_size)
            .collect();
        self.expand(page, 0, max_depth).await
    }

    fn expand(
        &self,
        ids: Vec<i64>,
        depth: usize,
        max_depth: usize,
    ) -> BoxFuture<'_, Result<Vec<CommentNode>>> {
        async move {
            if depth > max_depth {
                tracing::debug!("Truncating {} replies below depth {}", ids.len(), max_depth);
                return Ok(Vec::new());
            }

            let comments = self.fetch_comments(&ids).await?;

            let nodes = comments.into_iter().map(|comment| async move {
                let children = if comment.child_ids().is_empty() {
                    Vec::new()
                } else {
                    self.expand(comment.child_ids().to_vec(), depth + 1, max_depth)
                        .await?
                };
                Ok::<_, CatchupError>(CommentNode::new(comment, children, depth))
            });

            try_join_all(nodes).await
        }
        .boxed()
    }
}
