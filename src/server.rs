//! HTTP surface for federated search.
//!
//! ## Endpoints
//!
//! - `GET /api/search?q=` returns `{"results": [...]}` once every source
//!   has settled. Non-empty responses carry browser and CDN cache headers;
//!   empty ones carry none.
//! - `GET /api/search/ws?q=` streams one SSE `data:` frame per
//!   [`QueryEvent`](vidhub_search::QueryEvent) as sources settle.
//! - `GET /health` liveness probe.
//!
//! Callers authenticate with `Authorization: Bearer <token>` or an `auth`
//! cookie.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use vidhub_search::{
    CachePolicy, HttpSourceFetcher, SearchError, SearchPipeline, SearchResponse, SearchResult,
};

use crate::auth::TokenAuthenticator;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::registry::ConfigRegistry;

type Pipeline = SearchPipeline<ConfigRegistry, HttpSourceFetcher>;

const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");
const VERCEL_CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("vercel-cdn-cache-control");
const NETLIFY_VARY: HeaderName = HeaderName::from_static("netlify-vary");

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Query string of both search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Body of a blocking search response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchBody {
    pub results: Vec<SearchResult>,
}

/// Body of an error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    auth: Arc<TokenAuthenticator>,
}

// ---------------------------------------------------------------------------
// SearchServer
// ---------------------------------------------------------------------------

/// Federated search HTTP server running in a background task.
///
/// Dropping the server or calling [`SearchServer::shutdown`] cancels every
/// in-flight query and stops accepting connections.
pub struct SearchServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    pipeline: Arc<Pipeline>,
    shutdown: CancellationToken,
}

impl SearchServer {
    /// Validate `config`, build the search pipeline and start serving.
    ///
    /// Binds to `{server.host}:{server.port}` (use port `0` for auto-assign).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the HTTP client
    /// cannot be built, or the TCP listener cannot bind.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let registry = ConfigRegistry::from_config(config);
        let enabled_sources = registry.enabled_count();
        let fetcher = HttpSourceFetcher::new(&config.search)?;
        let pipeline = Arc::new(SearchPipeline::new(
            Arc::new(registry),
            Arc::new(fetcher),
            &config.search,
        ));
        let state = AppState {
            pipeline: Arc::clone(&pipeline),
            auth: Arc::new(TokenAuthenticator::from_config(config)),
        };

        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::Server(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AppError::Server(format!("failed to get local addr: {e}")))?;

        info!(%addr, sources = enabled_sources, "search server listening");

        let shutdown = CancellationToken::new();
        let app = router(state);
        let stop = shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
            {
                tracing::error!(error = %e, "search server error");
            }
        });

        Ok(Self {
            addr,
            handle,
            pipeline,
            shutdown,
        })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Cancel in-flight queries and stop accepting connections.
    pub fn shutdown(&self) {
        self.pipeline.shutdown();
        self.shutdown.cancel();
    }

    /// Shut down and wait until open connections have drained.
    pub async fn shutdown_gracefully(mut self) {
        self.shutdown();
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(error = %e, "search server task ended abnormally");
        }
    }
}

impl Drop for SearchServer {
    fn drop(&mut self) {
        self.pipeline.shutdown();
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(handle_search))
        .route("/api/search/ws", get(handle_search_stream))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /api/search`: blocking aggregated search.
async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    let caller = state.auth.authenticate(&headers);
    match state.pipeline.handle_query(&params.q, caller.as_ref()).await {
        Ok(response) => search_response(response),
        Err(err) => error_response(&err),
    }
}

/// `GET /api/search/ws`: streaming search over server-sent events.
///
/// The SSE body owns the query: when the client disconnects the body is
/// dropped and every in-flight source fetch is aborted.
async fn handle_search_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    let caller = state.auth.authenticate(&headers);
    let cancel = state.pipeline.query_token();
    match state
        .pipeline
        .handle_query_stream(&params.q, caller.as_ref(), cancel)
        .await
    {
        Ok(events) => {
            let frames = events.map(|event| Event::default().json_data(event));
            Sse::new(frames)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// `GET /health`: liveness probe.
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn search_response(response: SearchResponse) -> Response {
    let body = Json(SearchBody {
        results: response.results,
    });
    match response.cache {
        CachePolicy::Public { max_age_secs } => {
            let cdn = format!("public, s-maxage={max_age_secs}");
            let headers = [
                (
                    header::CACHE_CONTROL,
                    format!("public, max-age={max_age_secs}, s-maxage={max_age_secs}"),
                ),
                (CDN_CACHE_CONTROL, cdn.clone()),
                (VERCEL_CDN_CACHE_CONTROL, cdn),
                (NETLIFY_VARY, "query".to_owned()),
            ];
            (headers, body).into_response()
        }
        CachePolicy::Uncached => body.into_response(),
    }
}

/// Caller errors map to 401; everything else is a generic 500.
fn error_response(err: &SearchError) -> Response {
    if err.is_caller_error() {
        let body = ErrorBody {
            error: err.to_string(),
        };
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    tracing::error!(error = %err, "search failed");
    let body = ErrorBody {
        error: "search failed".to_owned(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
