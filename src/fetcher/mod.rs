//! Ordered story lists and recursively expanded comment trees on top of an
//! [`ItemSource`](crate::source::ItemSource).
//!
//! Every fan-out issues one request per id concurrently and re-establishes a
//! deterministic order before returning, so callers never observe arrival
//! order. A transport error from any single request aborts the whole
//! operation; items that decode to something else are dropped silently.

pub mod hierarchical;

pub use hierarchical::HierarchicalFetcher;

/// Upper bound on how many stories the recency filter looks at.
pub const MAX_RECENCY_WINDOW: usize = 150;

/// Over-fetch factor compensating for type and time filtering.
pub const RECENCY_OVERFETCH: usize = 3;

pub const DEFAULT_MAX_DEPTH: usize = 3;

/// How a story fan-out orders its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoryOrder {
    /// Position in the requested id list (the forum's own ranking).
    #[default]
    Ranked,
    /// Highest score first; ties keep ranking order.
    ByScore,
}
