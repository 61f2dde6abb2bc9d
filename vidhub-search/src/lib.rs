//! # vidhub-search
//!
//! Federated video search: one query fanned out to many independent
//! upstream sources, merged into a single result set.
//!
//! ## Design
//!
//! - Every source is queried concurrently with its own hard deadline, so a
//!   slow or broken source never delays the others
//! - Results are delivered either as one batch (blocking mode) or as an
//!   incremental [`QueryEvent`] stream in settlement order (streaming mode)
//! - Near-identical titles from different sources are grouped, never
//!   dropped, and every group keeps the provenance of all its members
//! - A content policy excludes blocked categories before grouping
//! - Source failures are logged and absorbed; only caller and registry
//!   errors reach the caller
//!
//! ## Collaborators
//!
//! The crate consumes two contracts: a [`SourceRegistry`] that lists the
//! sources a caller may query, and a [`SourceFetcher`] that queries one
//! source. [`HttpSourceFetcher`] implements the latter for video-CMS JSON
//! APIs.
//!
//! ## Security
//!
//! - Search queries are logged only at debug level
//! - Queries are rejected before any network call when no caller is known

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod orchestrator;
pub mod pipeline;
pub mod source;
pub mod types;

pub use cache::{CacheKey, ResultCache};
pub use config::{ContentFilterConfig, ResultCacheConfig, SearchConfig};
pub use error::{Result, SearchError};
pub use fetcher::HttpSourceFetcher;
pub use orchestrator::dedup::deduplicate;
pub use orchestrator::filter::ContentPolicy;
pub use orchestrator::search::{Orchestrator, SourceSettlement};
pub use orchestrator::similarity::similarity;
pub use pipeline::{CachePolicy, QueryEventStream, SearchPipeline, SearchResponse};
pub use source::{SourceFetcher, SourceRegistry};
pub use types::{
    CallerIdentity, DuplicateInfo, QueryEvent, SearchResult, SourceDescriptor, SourceSummary,
};

