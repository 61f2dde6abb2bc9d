//! Contracts for the two external collaborators of a query.
//!
//! - [`SourceRegistry`] yields the enabled sources for a caller.
//! - [`SourceFetcher`] queries one source and returns normalised results.
//!
//! Both are consumed generically by [`crate::Orchestrator`] and
//! [`crate::SearchPipeline`] so that production code and tests can plug in
//! their own implementations.

use std::future::Future;

use crate::error::SearchError;
use crate::types::{CallerIdentity, SearchResult, SourceDescriptor};

/// Queries a single upstream source.
///
/// Implementors perform the network call, decode the upstream payload and
/// return [`SearchResult`] values with `source_key`/`source_name` set from
/// `source`. Any error (network failure, non-success status, malformed
/// payload) is treated by the orchestrator as "source unavailable this
/// round". The orchestrator enforces the deadline and cancels the returned
/// future by dropping it, so implementations need no timeout of their own.
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
pub trait SourceFetcher: Send + Sync {
    /// Search `source` for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the source cannot answer this round.
    fn fetch(
        &self,
        source: &SourceDescriptor,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;
}

/// Resolves which sources a caller may query.
pub trait SourceRegistry: Send + Sync {
    /// List the enabled sources for `caller`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Registry`] if the registry is unavailable. This
    /// aborts the whole query.
    fn list_enabled_sources(
        &self,
        caller: &CallerIdentity,
    ) -> impl Future<Output = Result<Vec<SourceDescriptor>, SearchError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fetcher that returns canned results or fails.
    struct MockFetcher {
        titles: Vec<&'static str>,
    }

    impl SourceFetcher for MockFetcher {
        async fn fetch(
            &self,
            source: &SourceDescriptor,
            _query: &str,
        ) -> Result<Vec<SearchResult>, SearchError> {
            if self.titles.is_empty() {
                return Err(SearchError::Http("mock source failure".into()));
            }
            Ok(self
                .titles
                .iter()
                .map(|title| SearchResult::new(source, *title, "2020"))
                .collect())
        }
    }

    struct FixedRegistry(Vec<SourceDescriptor>);

    impl SourceRegistry for FixedRegistry {
        async fn list_enabled_sources(
            &self,
            _caller: &CallerIdentity,
        ) -> Result<Vec<SourceDescriptor>, SearchError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn mock_fetcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockFetcher>();
    }

    #[tokio::test]
    async fn fetcher_stamps_source_provenance() {
        let source = SourceDescriptor::new("alpha", "Alpha", "https://alpha");
        let fetcher = MockFetcher {
            titles: vec!["Heat", "Ronin"],
        };
        let results = fetcher.fetch(&source, "heat").await.expect("should succeed");
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.source_key == "alpha"));
        assert!(results.iter().all(|r| r.source_name == "Alpha"));
    }

    #[tokio::test]
    async fn fetcher_propagates_errors() {
        let source = SourceDescriptor::new("alpha", "Alpha", "https://alpha");
        let fetcher = MockFetcher { titles: vec![] };
        let err = fetcher.fetch(&source, "heat").await.unwrap_err();
        assert!(err.is_source_failure());
        assert!(err.to_string().contains("mock source failure"));
    }

    #[tokio::test]
    async fn registry_lists_sources() {
        let registry = FixedRegistry(vec![
            SourceDescriptor::new("a", "A", "https://a"),
            SourceDescriptor::new("b", "B", "https://b"),
        ]);
        let sources = registry
            .list_enabled_sources(&CallerIdentity::new("alice"))
            .await
            .expect("should succeed");
        let keys: Vec<&str> = sources.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
