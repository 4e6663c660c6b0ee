//! # hn-catchup
//!
//! A Hacker News reader that summarizes what you missed since your last visit.
//!
//! ## Architecture
//!
//! ```text
//! ItemSource → HierarchicalFetcher → DigestService → GenerationService → filter
//!                                         ↕
//!                                   VisitTracker → Store
//! ```
//!
//! - [`source`]: one HTTP round-trip per item against the public API
//! - [`fetcher`]: concurrent fan-out that restores ranked order, comment trees
//! - [`visit`]: persisted last-visit timestamp
//! - [`llm`]: generation backends and output cleanup
//! - [`digest`]: the catch-up digest and its cache
//!
//! ## Quick Start
//!
//! ```bash
//! # What happened since the last visit
//! hn-catchup digest
//!
//! # Done reading, start a new visit
//! hn-catchup mark-read
//!
//! # Browse
//! hn-catchup top --limit 10
//! hn-catchup comments 8863
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires the source, fetcher, store, visit
/// tracker and digest service together from a [`Config`](config::Config).
pub mod app;

/// Command-line interface using clap.
///
/// - `top`, `new`, `trending` - story listings
/// - `comments <id>` - comment tree of a story
/// - `digest [--force] [--bypass]` - catch-up summary
/// - `mark-read`, `last-visit` - visit bookkeeping
/// - `providers` - generation providers and local models
pub mod cli;

/// Configuration loaded from `~/.config/hn-catchup/config.toml`.
pub mod config;

/// The catch-up digest: recency gate, prompt, single-slot cache.
pub mod digest;

/// Core domain models.
///
/// - [`Story`](domain::Story), [`Comment`](domain::Comment): items as served
/// - [`CommentNode`](domain::CommentNode): materialized reply tree
/// - [`CatchUpSummary`](domain::CatchUpSummary): one digest
pub mod domain;

/// Concurrent story and comment fetching on top of an [`ItemSource`](source::ItemSource).
pub mod fetcher;

/// Generation backends: on-device daemon, downloaded local models, Anthropic.
pub mod llm;

/// Remote item API.
pub mod source;

/// SQLite key/value persistence.
pub mod store;

/// Last-visit tracking.
pub mod visit;
