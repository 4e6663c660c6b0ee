use serde::{Deserialize, Serialize};

use super::Comment;

/// A materialized comment with its expanded replies.
///
/// Children keep the order of the parent's `kids` list. `depth` is 0 for a
/// top-level comment and grows by one per level. The collapse flag belongs to
/// whoever renders the tree; the fetcher always builds nodes expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<CommentNode>,
    pub depth: usize,
    #[serde(default)]
    pub is_collapsed: bool,
}

impl CommentNode {
    pub fn new(comment: Comment, children: Vec<CommentNode>, depth: usize) -> Self {
        Self {
            comment,
            children,
            depth,
            is_collapsed: false,
        }
    }

    pub fn id(&self) -> i64 {
        self.comment.id
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn toggle_collapsed(&mut self) {
        self.is_collapsed = !self.is_collapsed;
    }

    /// Number of materialized nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Depth-first walk over `nodes`, not descending into collapsed nodes.
    pub fn flatten_visible(nodes: &[CommentNode]) -> Vec<&CommentNode> {
        let mut out = Vec::new();
        for node in nodes {
            out.push(node);
            if !node.is_collapsed {
                out.extend(Self::flatten_visible(&node.children));
            }
        }
        out
    }
}
