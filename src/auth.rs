//! Caller authentication by bearer token or `auth` cookie.

use std::collections::HashMap;

use axum::http::{HeaderMap, header};
use vidhub_search::CallerIdentity;

use crate::config::AppConfig;

/// Name of the cookie carrying a user token.
pub const AUTH_COOKIE: &str = "auth";

/// Resolves request credentials to a [`CallerIdentity`].
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    /// Token → username.
    tokens: HashMap<String, String>,
}

impl TokenAuthenticator {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tokens: config
                .users
                .iter()
                .map(|user| (user.token.clone(), user.username.clone()))
                .collect(),
        }
    }

    /// Identify the caller of a request.
    ///
    /// `Authorization: Bearer <token>` takes precedence over the `auth`
    /// cookie. Returns `None` when no known token is presented.
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<CallerIdentity> {
        let token = bearer_token(headers).or_else(|| cookie_token(headers))?;
        match self.tokens.get(token) {
            Some(username) => Some(CallerIdentity::new(username.as_str())),
            None => {
                tracing::debug!("rejected unknown token");
                None
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == AUTH_COOKIE && !value.is_empty()).then_some(value)
        })
}
