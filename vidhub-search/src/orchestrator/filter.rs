//! Content-policy filtering by result category.

use crate::config::ContentFilterConfig;
use crate::types::SearchResult;

/// A denylist of category terms applied to `type_name`.
#[derive(Debug, Clone, Default)]
pub struct ContentPolicy {
    enabled: bool,
    blocked_terms: Vec<String>,
}

impl ContentPolicy {
    /// Build the policy from configuration.
    pub fn from_config(config: &ContentFilterConfig) -> Self {
        Self {
            enabled: config.enabled,
            blocked_terms: config.blocked_terms.clone(),
        }
    }

    /// A policy that keeps every result.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `result` is excluded by this policy.
    ///
    /// Case-sensitive substring match against `type_name`.
    pub fn blocks(&self, result: &SearchResult) -> bool {
        self.enabled
            && self
                .blocked_terms
                .iter()
                .any(|term| result.type_name.contains(term.as_str()))
    }

    /// Drop every blocked result, preserving the order of the rest.
    pub fn apply(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        if !self.enabled {
            return results;
        }
        let before = results.len();
        let kept: Vec<SearchResult> = results.into_iter().filter(|r| !self.blocks(r)).collect();
        if kept.len() < before {
            tracing::debug!(dropped = before - kept.len(), "content policy excluded results");
        }
        kept
    }
}
