//! Aggregation pipeline: caller check, source resolution, fan-out, content
//! filter, duplicate grouping and the cache policy of the response.

use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::orchestrator::dedup::deduplicate;
use crate::orchestrator::filter::ContentPolicy;
use crate::orchestrator::search::Orchestrator;
use crate::source::{SourceFetcher, SourceRegistry};
use crate::types::{CallerIdentity, QueryEvent, SearchResult};

/// A one-shot stream of query events.
pub type QueryEventStream = Pin<Box<dyn Stream<Item = QueryEvent> + Send>>;

/// How a response may be cached by browsers and CDNs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Cacheable by browser and CDN for `max_age_secs`.
    Public { max_age_secs: u64 },
    /// No caching directives, forcing revalidation. Used for empty results,
    /// which usually reflect source flakiness rather than a true absence of
    /// content.
    Uncached,
}

/// Blocking-mode response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub cache: CachePolicy,
}

/// Composes registry, orchestrator, content policy and deduplication.
pub struct SearchPipeline<R, F> {
    registry: Arc<R>,
    orchestrator: Orchestrator<F>,
    policy: ContentPolicy,
    cache: ResultCache,
    cache_ttl_seconds: u64,
    shutdown: CancellationToken,
}

impl<R: SourceRegistry, F: SourceFetcher + 'static> SearchPipeline<R, F> {
    /// Build a pipeline from its collaborators and `config`.
    ///
    /// The result cache is built from `config.result_cache`; use
    /// [`SearchPipeline::with_cache`] to share one between pipelines.
    pub fn new(registry: Arc<R>, fetcher: Arc<F>, config: &SearchConfig) -> Self {
        Self {
            registry,
            orchestrator: Orchestrator::new(fetcher, config.per_source_timeout()),
            policy: ContentPolicy::from_config(&config.content_filter),
            cache: ResultCache::new(&config.result_cache),
            cache_ttl_seconds: config.cache_ttl_seconds,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cache_ttl_seconds
    }

    /// A fresh cancellation token for one query. Cancelled by [`Self::shutdown`].
    pub fn query_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Cancel every in-flight query.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Blocking mode: run the whole pipeline and return one envelope.
    ///
    /// The query reaches the fetchers as given; trimming only decides
    /// emptiness. An empty query returns an empty, cacheable envelope without touching
    /// the registry or any source. An empty final list is marked
    /// [`CachePolicy::Uncached`].
    ///
    /// # Errors
    ///
    /// - [`SearchError::Unauthorized`] if `caller` is absent or invalid.
    /// - Registry errors, unchanged.
    /// - [`SearchError::Cancelled`] if the pipeline shuts down mid-query.
    ///
    /// Individual source failures never surface here.
    pub async fn handle_query(
        &self,
        query: &str,
        caller: Option<&CallerIdentity>,
    ) -> Result<SearchResponse> {
        let span = tracing::debug_span!("query", query_id = %Uuid::new_v4(), mode = "blocking");
        self.run_blocking(query, caller).instrument(span).await
    }

    async fn run_blocking(
        &self,
        query: &str,
        caller: Option<&CallerIdentity>,
    ) -> Result<SearchResponse> {
        let caller = authorize(caller)?;
        if query.trim().is_empty() {
            tracing::debug!("empty query, skipping fan-out");
            return Ok(SearchResponse {
                results: Vec::new(),
                cache: CachePolicy::Public {
                    max_age_secs: self.cache_ttl_seconds,
                },
            });
        }

        let sources = self.registry.list_enabled_sources(caller).await?;
        tracing::debug!(query, sources = sources.len(), "query started");

        let key = CacheKey::new(query, &sources, self.policy.is_enabled());
        if let Some(results) = self.cache.get(&key).await {
            tracing::debug!(count = results.len(), "result cache hit");
            return Ok(self.envelope(results));
        }

        let results = self
            .orchestrator
            .search_all(query, &sources, &self.query_token())
            .await?;
        let results = deduplicate(self.policy.apply(results));

        if self.cache.is_enabled() {
            self.cache.insert(key, results.clone()).await;
        }
        tracing::debug!(count = results.len(), "query complete");
        Ok(self.envelope(results))
    }

    /// Streaming mode: resolve the caller's sources, then return the event
    /// stream. Every `SourceResult` batch passes through the content policy.
    /// Results are not grouped across batches.
    ///
    /// An empty query yields `Start { 0 }` followed by `Complete { 0 }`.
    ///
    /// # Errors
    ///
    /// Caller and registry errors are returned before any event is produced.
    pub async fn handle_query_stream(
        &self,
        query: &str,
        caller: Option<&CallerIdentity>,
        cancel: CancellationToken,
    ) -> Result<QueryEventStream> {
        let span = tracing::debug_span!("query", query_id = %Uuid::new_v4(), mode = "stream");
        let caller = authorize(caller)?;
        if query.trim().is_empty() {
            return Ok(Box::pin(futures::stream::iter([
                QueryEvent::Start { total_sources: 0 },
                QueryEvent::Complete {
                    completed_sources: 0,
                },
            ])));
        }

        let sources = self
            .registry
            .list_enabled_sources(caller)
            .instrument(span.clone())
            .await?;
        span.in_scope(|| tracing::debug!(query, sources = sources.len(), "query started"));

        let mut events = Box::pin(self.orchestrator.search_stream(query, &sources, cancel));
        let policy = self.policy.clone();

        Ok(Box::pin(async_stream::stream! {
            while let Some(event) = events.next().instrument(span.clone()).await {
                yield match event {
                    QueryEvent::SourceResult { source_id, source_name, results } => {
                        let results = span.in_scope(|| policy.apply(results));
                        QueryEvent::SourceResult { source_id, source_name, results }
                    }
                    other => other,
                };
            }
        }))
    }

    fn envelope(&self, results: Vec<SearchResult>) -> SearchResponse {
        let cache = if results.is_empty() {
            CachePolicy::Uncached
        } else {
            CachePolicy::Public {
                max_age_secs: self.cache_ttl_seconds,
            }
        };
        SearchResponse { results, cache }
    }
}

fn authorize(caller: Option<&CallerIdentity>) -> Result<&CallerIdentity> {
    match caller {
        Some(caller) if caller.is_valid() => Ok(caller),
        Some(_) => Err(SearchError::Unauthorized("invalid caller identity".into())),
        None => Err(SearchError::Unauthorized("missing caller identity".into())),
    }
}
