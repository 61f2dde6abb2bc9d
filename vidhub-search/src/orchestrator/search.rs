//! Core fan-out orchestrator: one bounded-time fetch per source, fan-in by
//! settlement.
//!
//! Every source is queried in its own spawned task with its own child
//! [`CancellationToken`] and deadline. Settled tasks are gathered through a
//! [`FuturesUnordered`], so a slow source never delays delivery of a fast
//! one. Dropping the fan-in aborts every task that has not settled yet.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::error::SearchError;
use crate::source::SourceFetcher;
use crate::types::{QueryEvent, SearchResult, SourceDescriptor};

/// Deadline applied to each source when none is configured.
pub const DEFAULT_PER_SOURCE_TIMEOUT: Duration = Duration::from_secs(20);

/// The final state of one source's fetch.
#[derive(Debug)]
pub struct SourceSettlement {
    /// Position of the source in the registry listing.
    pub index: usize,
    /// The source that settled.
    pub source: SourceDescriptor,
    /// Results, or the reason the source is unavailable this round.
    pub outcome: Result<Vec<SearchResult>, SearchError>,
    /// Time from fan-out to settlement.
    pub elapsed: Duration,
}

impl SourceSettlement {
    /// Convert into the per-source streaming event, logging failures.
    pub fn into_event(self) -> QueryEvent {
        let SourceSettlement {
            source,
            outcome,
            elapsed,
            ..
        } = self;
        match outcome {
            Ok(results) => {
                tracing::debug!(
                    source = %source,
                    count = results.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "source returned results"
                );
                QueryEvent::SourceResult {
                    source_id: source.key,
                    source_name: source.name,
                    results,
                }
            }
            Err(err) => {
                tracing::warn!(source = %source, error = %err, "source query failed");
                QueryEvent::SourceError {
                    source_id: source.key,
                    source_name: source.name,
                    error: err.to_string(),
                }
            }
        }
    }
}

/// Fans one query out to many sources concurrently.
pub struct Orchestrator<F> {
    fetcher: Arc<F>,
    per_source_timeout: Duration,
}

impl<F> Clone for Orchestrator<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            per_source_timeout: self.per_source_timeout,
        }
    }
}

impl<F: SourceFetcher + 'static> Orchestrator<F> {
    /// Create an orchestrator that gives every source `per_source_timeout`
    /// to settle.
    pub fn new(fetcher: Arc<F>, per_source_timeout: Duration) -> Self {
        Self {
            fetcher,
            per_source_timeout,
        }
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    pub fn per_source_timeout(&self) -> Duration {
        self.per_source_timeout
    }

    /// Blocking mode: wait for every source to settle and return all
    /// successful results flattened in source-registration order.
    ///
    /// Failed and timed-out sources contribute nothing and are only logged.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if `cancel` fires first. In-flight
    /// fetches are aborted and no partial result is returned.
    pub async fn search_all(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut pending = self.fan_out(query, sources, cancel);
        let mut settled = Vec::with_capacity(sources.len());

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                settlement = pending.next() => Some(settlement),
            };
            let Some(settlement) = next else {
                tracing::debug!(settled = settled.len(), "query cancelled, abandoning sources");
                return Err(SearchError::Cancelled);
            };
            match settlement {
                Some(settlement) => settled.push(settlement),
                None => break,
            }
        }

        settled.sort_by_key(|s| s.index);

        let mut results = Vec::new();
        let mut failed = 0usize;
        for settlement in settled {
            match settlement.outcome {
                Ok(batch) => {
                    tracing::debug!(
                        source = %settlement.source,
                        count = batch.len(),
                        "source returned results"
                    );
                    results.extend(batch);
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!(source = %settlement.source, error = %err, "source query failed");
                }
            }
        }

        tracing::debug!(
            sources = sources.len(),
            failed,
            count = results.len(),
            "fan-out settled"
        );
        Ok(results)
    }

    /// Streaming mode: a one-shot stream of [`QueryEvent`]s.
    ///
    /// Emits `Start` immediately, then one `SourceResult` or `SourceError`
    /// per source in settlement order, then `Complete`. Fan-out begins on
    /// the first poll.
    ///
    /// If `cancel` fires, or the stream is dropped, in-flight fetches are
    /// aborted and the stream ends without `Complete`.
    pub fn search_stream(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
        cancel: CancellationToken,
    ) -> impl Stream<Item = QueryEvent> + Send + 'static {
        let total_sources = sources.len();
        let mut pending = self.fan_out(query, sources, &cancel);

        async_stream::stream! {
            yield QueryEvent::Start { total_sources };

            let mut completed_sources = 0usize;
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    settlement = pending.next() => Some(settlement),
                };
                let Some(settlement) = next else {
                    tracing::debug!(completed_sources, total_sources, "query cancelled, stream closed");
                    return;
                };
                let Some(settlement) = settlement else {
                    break;
                };
                completed_sources += 1;
                yield settlement.into_event();
            }

            yield QueryEvent::Complete { completed_sources };
        }
    }

    /// Spawn one task per source. Each element resolves when its source
    /// settles; dropping an element aborts its task.
    fn fan_out(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
        cancel: &CancellationToken,
    ) -> FuturesUnordered<impl Future<Output = SourceSettlement> + Send + 'static> {
        sources
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, source)| {
                let fetcher = Arc::clone(&self.fetcher);
                let query = query.to_owned();
                let deadline = self.per_source_timeout;
                let token = cancel.child_token();

                async move {
                    let started = Instant::now();
                    let task_source = source.clone();
                    let task = AbortOnDropHandle::new(tokio::spawn(async move {
                        fetch_with_deadline(fetcher.as_ref(), &task_source, &query, deadline, &token)
                            .await
                    }));

                    let outcome = match task.await {
                        Ok(outcome) => outcome,
                        Err(join_err) => Err(SearchError::Orchestration(format!(
                            "source task failed: {join_err}"
                        ))),
                    };

                    SourceSettlement {
                        index,
                        source,
                        outcome,
                        elapsed: started.elapsed(),
                    }
                }
            })
            .collect()
    }
}

/// Run one fetch under its deadline and cancellation token.
///
/// A timeout is reported like any other source failure.
async fn fetch_with_deadline<F: SourceFetcher>(
    fetcher: &F,
    source: &SourceDescriptor,
    query: &str,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<SearchResult>, SearchError> {
    tokio::select! {
        () = cancel.cancelled() => Err(SearchError::Cancelled),
        outcome = tokio::time::timeout(deadline, fetcher.fetch(source, query)) => match outcome {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(format!(
                "{} exceeded {}ms",
                source.key,
                deadline.as_millis()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    enum Behavior {
        Titles(Vec<&'static str>),
        Fail,
    }

    /// Per-source scripted delay and outcome.
    struct ScriptedFetcher {
        script: HashMap<&'static str, (Duration, Behavior)>,
        calls: AtomicUsize,
        abandoned: Arc<AtomicUsize>,
    }

    /// Counts fetches dropped before they finished.
    struct InFlight {
        abandoned: Arc<AtomicUsize>,
        armed: bool,
    }

    impl Drop for InFlight {
        fn drop(&mut self) {
            if self.armed {
                self.abandoned.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl ScriptedFetcher {
        fn new(script: Vec<(&'static str, u64, Behavior)>) -> Self {
            Self {
                script: script
                    .into_iter()
                    .map(|(key, ms, behavior)| (key, (Duration::from_millis(ms), behavior)))
                    .collect(),
                calls: AtomicUsize::new(0),
                abandoned: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SourceFetcher for ScriptedFetcher {
        async fn fetch(
            &self,
            source: &SourceDescriptor,
            _query: &str,
        ) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, behavior) = self
                .script
                .get(source.key.as_str())
                .cloned()
                .unwrap_or((Duration::ZERO, Behavior::Titles(vec![])));

            let mut guard = InFlight {
                abandoned: Arc::clone(&self.abandoned),
                armed: true,
            };
            tokio::time::sleep(delay).await;
            guard.armed = false;

            match behavior {
                Behavior::Titles(titles) => Ok(titles
                    .into_iter()
                    .map(|t| SearchResult::new(source, t, "2020"))
                    .collect()),
                Behavior::Fail => Err(SearchError::Http("status 502".into())),
            }
        }
    }

    fn sources(keys: &[&str]) -> Vec<SourceDescriptor> {
        keys.iter()
            .map(|k| SourceDescriptor::new(*k, format!("{k} name"), format!("https://{k}")))
            .collect()
    }

    fn orchestrator(fetcher: ScriptedFetcher, timeout_ms: u64) -> Orchestrator<ScriptedFetcher> {
        Orchestrator::new(Arc::new(fetcher), Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn blocking_mode_preserves_registration_order() {
        let fetcher = ScriptedFetcher::new(vec![
            ("a", 120, Behavior::Titles(vec!["a1", "a2"])),
            ("b", 10, Behavior::Titles(vec!["b1"])),
            ("c", 60, Behavior::Titles(vec!["c1"])),
        ]);
        let orch = orchestrator(fetcher, 1_000);
        let results = orch
            .search_all("q", &sources(&["a", "b", "c"]), &CancellationToken::new())
            .await
            .expect("should succeed");
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["a1", "a2", "b1", "c1"]);
    }

    #[tokio::test]
    async fn blocking_mode_swallows_failures_and_timeouts() {
        let fetcher = ScriptedFetcher::new(vec![
            ("ok", 0, Behavior::Titles(vec!["kept"])),
            ("broken", 0, Behavior::Fail),
            ("slow", 5_000, Behavior::Titles(vec!["late"])),
        ]);
        let orch = orchestrator(fetcher, 200);
        let started = Instant::now();
        let results = orch
            .search_all("q", &sources(&["ok", "broken", "slow"]), &CancellationToken::new())
            .await
            .expect("source failures never fail the query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "kept");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn blocking_mode_with_no_sources_is_empty() {
        let orch = orchestrator(ScriptedFetcher::new(vec![]), 100);
        let results = orch
            .search_all("q", &[], &CancellationToken::new())
            .await
            .expect("should succeed");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn stream_emits_start_per_source_events_and_complete() {
        let fetcher = ScriptedFetcher::new(vec![
            ("a", 30, Behavior::Titles(vec!["a1"])),
            ("b", 0, Behavior::Fail),
            ("c", 10, Behavior::Titles(vec![])),
        ]);
        let orch = orchestrator(fetcher, 1_000);
        let events: Vec<QueryEvent> = orch
            .search_stream("q", &sources(&["a", "b", "c"]), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(events.len(), 5);
        assert_eq!(events[0], QueryEvent::Start { total_sources: 3 });
        assert_eq!(events[4], QueryEvent::Complete { completed_sources: 3 });

        let mut ids: Vec<&str> = events[1..4].iter().filter_map(QueryEvent::source_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["a", "b", "c"]);

        let errors = events
            .iter()
            .filter(|e| matches!(e, QueryEvent::SourceError { .. }))
            .count();
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn stream_delivers_in_settlement_order() {
        let fetcher = ScriptedFetcher::new(vec![
            ("slow", 300, Behavior::Titles(vec!["s"])),
            ("fast", 10, Behavior::Titles(vec!["f"])),
        ]);
        let orch = orchestrator(fetcher, 2_000);
        let events: Vec<QueryEvent> = orch
            .search_stream("q", &sources(&["slow", "fast"]), CancellationToken::new())
            .collect()
            .await;
        assert_eq!(events[1].source_id(), Some("fast"));
        assert_eq!(events[2].source_id(), Some("slow"));
    }

    #[tokio::test]
    async fn timed_out_source_reported_as_error() {
        let fetcher = ScriptedFetcher::new(vec![("slow", 5_000, Behavior::Titles(vec!["x"]))]);
        let orch = orchestrator(fetcher, 100);
        let events: Vec<QueryEvent> = orch
            .search_stream("q", &sources(&["slow"]), CancellationToken::new())
            .collect()
            .await;
        match &events[1] {
            QueryEvent::SourceError { source_id, error, .. } => {
                assert_eq!(source_id, "slow");
                assert!(error.contains("timed out"));
            }
            other => panic!("expected SourceError, got {other:?}"),
        }
        assert_eq!(events[2], QueryEvent::Complete { completed_sources: 1 });
    }

    #[tokio::test]
    async fn stream_with_no_sources_starts_and_completes() {
        let orch = orchestrator(ScriptedFetcher::new(vec![]), 100);
        let events: Vec<QueryEvent> = orch
            .search_stream("q", &[], CancellationToken::new())
            .collect()
            .await;
        assert_eq!(
            events,
            [
                QueryEvent::Start { total_sources: 0 },
                QueryEvent::Complete { completed_sources: 0 }
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_stops_stream_and_aborts_fetches() {
        let fetcher = ScriptedFetcher::new(vec![
            ("fast", 0, Behavior::Titles(vec!["f"])),
            ("slow", 5_000, Behavior::Titles(vec!["s"])),
        ]);
        let abandoned = Arc::clone(&fetcher.abandoned);
        let orch = orchestrator(fetcher, 10_000);
        let cancel = CancellationToken::new();
        let mut stream = Box::pin(orch.search_stream("q", &sources(&["fast", "slow"]), cancel.clone()));

        assert!(matches!(stream.next().await, Some(QueryEvent::Start { .. })));
        assert_eq!(stream.next().await.and_then(|e| e.source_id().map(str::to_owned)), Some("fast".into()));

        cancel.cancel();
        assert!(stream.next().await.is_none(), "no events after cancellation");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(abandoned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_stream_aborts_fetches() {
        let fetcher = ScriptedFetcher::new(vec![("slow", 5_000, Behavior::Titles(vec!["s"]))]);
        let abandoned = Arc::clone(&fetcher.abandoned);
        let orch = orchestrator(fetcher, 10_000);
        let mut stream = Box::pin(orch.search_stream("q", &sources(&["slow"]), CancellationToken::new()));

        assert!(matches!(stream.next().await, Some(QueryEvent::Start { .. })));
        // Poll once more so the fetch task is spawned, then give up on it.
        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());
        drop(stream);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(abandoned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blocking_mode_cancellation_returns_cancelled() {
        let fetcher = ScriptedFetcher::new(vec![("slow", 5_000, Behavior::Titles(vec!["s"]))]);
        let orch = orchestrator(fetcher, 10_000);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = orch
            .search_all("q", &sources(&["slow"]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[tokio::test]
    async fn every_source_fetched_exactly_once() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let orch = orchestrator(fetcher, 1_000);
        let keys = ["a", "b", "c", "d", "e"];
        let _ = orch
            .search_all("q", &sources(&keys), &CancellationToken::new())
            .await;
        assert_eq!(orch.fetcher().calls.load(Ordering::SeqCst), keys.len());
    }
}
