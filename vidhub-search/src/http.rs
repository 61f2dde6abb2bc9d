//! Keep-alive client shared by every upstream fetch.
//!
//! Video-CMS endpoints commonly reject non-browser agents, so each client
//! presents one browser User-Agent picked at build time.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::SearchConfig;
use crate::error::SearchError;

const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_REDIRECTS: usize = 5;

/// Build the client used for upstream source queries.
///
/// The request timeout matches the per-source deadline, so a stalled socket
/// is released even if the orchestrator's timer has already fired.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the TLS backend cannot be initialised.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_owned());

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(agent)
        .timeout(config.per_source_timeout())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_keepalive(POOL_IDLE_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| SearchError::Http(format!("client build failed: {e}")))
}

pub fn random_user_agent() -> &'static str {
    let Some(agent) = BROWSER_AGENTS.choose(&mut rand::thread_rng()) else {
        return BROWSER_AGENTS[0];
    };
    agent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_a_browser_agent() {
        for _ in 0..20 {
            assert!(BROWSER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn builds_with_rotating_or_configured_agent() {
        assert!(build_client(&SearchConfig::default()).is_ok());
        let config = SearchConfig {
            user_agent: Some("vidhub/0.1".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }
}
