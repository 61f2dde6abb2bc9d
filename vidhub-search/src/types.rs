//! Core types: source descriptors, normalised results, duplicate
//! annotations and streaming query events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel year used when a source does not report a release year.
pub const UNKNOWN_YEAR: &str = "unknown";

/// One upstream content source, as resolved from the source registry.
///
/// Immutable for the duration of one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Stable key, unique within a registry snapshot.
    pub key: String,
    /// Human-readable source name.
    pub name: String,
    /// Search API base URL. Opaque to the orchestrator.
    pub api: String,
    /// Optional detail-page base URL. Opaque to the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SourceDescriptor {
    /// Create a descriptor with no detail URL.
    pub fn new(key: impl Into<String>, name: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            api: api.into(),
            detail: None,
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// A single search result returned by one source for one query.
///
/// Produced by a [`crate::SourceFetcher`] in normalised form; downstream
/// code never sees the upstream payload shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Item id within its source.
    #[serde(default)]
    pub id: String,
    /// Display title.
    pub title: String,
    /// Poster image URL.
    #[serde(default)]
    pub poster: String,
    /// Ordered episode play URLs. One entry means a movie.
    #[serde(default)]
    pub episodes: Vec<String>,
    /// Episode titles, parallel to `episodes`.
    #[serde(default)]
    pub episodes_titles: Vec<String>,
    /// Key of the source that returned this result.
    #[serde(rename = "source")]
    pub source_key: String,
    /// Display name of the source that returned this result.
    #[serde(rename = "source_name")]
    pub source_name: String,
    /// Free-text classification reported by the source.
    #[serde(default)]
    pub class: String,
    /// Four-digit release year, or [`UNKNOWN_YEAR`].
    #[serde(default = "unknown_year")]
    pub year: String,
    /// Plain-text description.
    #[serde(default)]
    pub desc: String,
    /// Content category used for policy filtering.
    #[serde(default)]
    pub type_name: String,
    /// Douban id when the source knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub douban_id: Option<u64>,
    /// Duplicate-group annotation. Absent for results with no duplicate.
    #[serde(flatten)]
    pub duplicate: Option<DuplicateInfo>,
}

fn unknown_year() -> String {
    UNKNOWN_YEAR.to_owned()
}

impl SearchResult {
    /// Create a result for `source` with the given title and year and no episodes.
    pub fn new(source: &SourceDescriptor, title: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: year.into(),
            source_key: source.key.clone(),
            source_name: source.name.clone(),
            ..Default::default()
        }
    }

    /// Number of episodes this result carries.
    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// A single-episode result is a movie; anything longer is a series.
    pub fn is_movie(&self) -> bool {
        self.episodes.len() == 1
    }

    /// Returns the year when it is a real value rather than the sentinel.
    pub fn known_year(&self) -> Option<&str> {
        let year = self.year.trim();
        (!year.is_empty() && year != UNKNOWN_YEAR).then_some(year)
    }
}

/// Annotation attached to every member of a duplicate group of size > 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateInfo {
    /// 1-based group number, assigned in group-discovery order.
    pub duplicate_group: usize,
    /// `true` for exactly one member: the one with the most episodes.
    pub is_primary: bool,
    /// Number of members in the group.
    pub duplicate_count: usize,
    /// Every member's provenance, in group-member order.
    pub all_sources: Vec<SourceSummary>,
}

/// Provenance of one duplicate-group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Source key.
    #[serde(rename = "source")]
    pub source_key: String,
    /// Source display name.
    pub source_name: String,
    /// Episode count of that member.
    #[serde(rename = "episodes_count")]
    pub episode_count: usize,
}

impl From<&SearchResult> for SourceSummary {
    fn from(result: &SearchResult) -> Self {
        Self {
            source_key: result.source_key.clone(),
            source_name: result.source_name.clone(),
            episode_count: result.episode_count(),
        }
    }
}

/// An incremental event delivered in streaming mode.
///
/// A stream carries exactly one [`QueryEvent::Start`], then exactly one
/// [`QueryEvent::SourceResult`] or [`QueryEvent::SourceError`] per source in
/// settlement order, then exactly one [`QueryEvent::Complete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    /// Fan-out has begun.
    #[serde(rename_all = "camelCase")]
    Start { total_sources: usize },
    /// One source settled successfully.
    #[serde(rename_all = "camelCase")]
    SourceResult {
        source_id: String,
        source_name: String,
        results: Vec<SearchResult>,
    },
    /// One source failed or timed out.
    #[serde(rename_all = "camelCase")]
    SourceError {
        source_id: String,
        source_name: String,
        error: String,
    },
    /// Every source has settled.
    #[serde(rename_all = "camelCase")]
    Complete { completed_sources: usize },
}

impl QueryEvent {
    /// Source key for per-source events.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::SourceResult { source_id, .. } | Self::SourceError { source_id, .. } => {
                Some(source_id)
            }
            Self::Start { .. } | Self::Complete { .. } => None,
        }
    }
}

/// The authenticated caller of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Username resolved by the authentication collaborator.
    pub username: String,
}

impl CallerIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// An identity with a blank username is treated as absent.
    pub fn is_valid(&self) -> bool {
        !self.username.trim().is_empty()
    }
}
