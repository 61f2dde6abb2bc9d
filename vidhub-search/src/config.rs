//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls per-source deadlines, HTTP cache lifetimes,
//! the content policy, upstream paging and the optional in-process result
//! cache. Every section deserialises with defaults for missing fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Category terms excluded by the default content policy.
pub const DEFAULT_BLOCKED_TERMS: &[&str] = &[
    "伦理片",
    "福利",
    "里番动漫",
    "门事件",
    "萝莉少女",
    "制服诱惑",
    "国产传媒",
    "cosplay",
    "黑丝诱惑",
    "无码",
    "日本无码",
    "有码",
    "日本有码",
    "SWAG",
    "网红主播",
    "色情片",
    "同性片",
    "福利视频",
    "福利片",
];

/// Configuration for federated search queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard deadline for each source, in milliseconds. Independent per source.
    pub per_source_timeout_ms: u64,
    /// Browser and CDN cache lifetime for non-empty responses, in seconds.
    pub cache_ttl_seconds: u64,
    /// Policy-based exclusion of result categories.
    pub content_filter: ContentFilterConfig,
    /// Maximum number of result pages requested from one source.
    pub max_pages: u32,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// In-process memo of recent aggregated results.
    pub result_cache: ResultCacheConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_source_timeout_ms: 20_000,
            cache_ttl_seconds: 7_200,
            content_filter: ContentFilterConfig::default(),
            max_pages: 5,
            user_agent: None,
            result_cache: ResultCacheConfig::default(),
        }
    }
}

/// Content-policy filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilterConfig {
    /// When `false` the filter is a no-op.
    pub enabled: bool,
    /// Results whose `type_name` contains any of these terms are dropped.
    /// Matching is a case-sensitive substring test.
    pub blocked_terms: Vec<String>,
}

impl Default for ContentFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_terms: DEFAULT_BLOCKED_TERMS
                .iter()
                .map(|term| (*term).to_owned())
                .collect(),
        }
    }
}

/// In-process result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultCacheConfig {
    /// Maximum number of cached result sets.
    pub capacity: u64,
    /// Entry lifetime in seconds. 0 disables the cache.
    pub ttl_seconds: u64,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl_seconds: 0,
        }
    }
}

impl SearchConfig {
    /// The per-source deadline as a [`Duration`].
    pub fn per_source_timeout(&self) -> Duration {
        Duration::from_millis(self.per_source_timeout_ms)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `per_source_timeout_ms` must be greater than 0
    /// - `max_pages` must be greater than 0
    /// - `blocked_terms` must not contain an empty term
    /// - `result_cache.capacity` must be greater than 0 when the cache is enabled
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.per_source_timeout_ms == 0 {
            return Err(SearchError::Config(
                "per_source_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(SearchError::Config("max_pages must be greater than 0".into()));
        }
        if self
            .content_filter
            .blocked_terms
            .iter()
            .any(|term| term.is_empty())
        {
            return Err(SearchError::Config(
                "content_filter.blocked_terms must not contain an empty term".into(),
            ));
        }
        if self.result_cache.ttl_seconds > 0 && self.result_cache.capacity == 0 {
            return Err(SearchError::Config(
                "result_cache.capacity must be greater than 0 when the cache is enabled".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert_eq!(config.per_source_timeout_ms, 20_000);
        assert_eq!(config.per_source_timeout(), Duration::from_secs(20));
        assert_eq!(config.cache_ttl_seconds, 7_200);
        assert_eq!(config.max_pages, 5);
        assert!(config.user_agent.is_none());
        assert!(config.content_filter.enabled);
        assert!(!config.content_filter.blocked_terms.is_empty());
        assert_eq!(config.result_cache.ttl_seconds, 0);
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = SearchConfig {
            per_source_timeout_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("per_source_timeout_ms"));
    }

    #[test]
    fn zero_max_pages_rejected() {
        let config = SearchConfig {
            max_pages: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_pages"));
    }

    #[test]
    fn empty_blocked_term_rejected() {
        let config = SearchConfig {
            content_filter: ContentFilterConfig {
                enabled: true,
                blocked_terms: vec!["福利".into(), String::new()],
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("blocked_terms"));
    }

    #[test]
    fn enabled_cache_needs_capacity() {
        let config = SearchConfig {
            result_cache: ResultCacheConfig {
                capacity: 0,
                ttl_seconds: 60,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let disabled = SearchConfig {
            result_cache: ResultCacheConfig {
                capacity: 0,
                ttl_seconds: 0,
            },
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"per_source_timeout_ms": 500}"#).expect("deserialize");
        assert_eq!(config.per_source_timeout_ms, 500);
        assert_eq!(config.cache_ttl_seconds, 7_200);
        assert!(config.content_filter.enabled);
    }

    #[test]
    fn custom_user_agent() {
        let config = SearchConfig {
            user_agent: Some("CustomBot/1.0".into()),
            ..Default::default()
        };
        assert_eq!(config.user_agent.as_deref(), Some("CustomBot/1.0"));
        assert!(config.validate().is_ok());
    }
}
