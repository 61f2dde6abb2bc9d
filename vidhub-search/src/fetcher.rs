//! HTTP source fetcher for the common video-CMS JSON search API.
//!
//! Sources expose `GET {api}?ac=videolist&wd={query}[&pg=N]` returning a
//! paged `list` of `vod_*` records. This module turns those records into
//! normalised [`SearchResult`] values so nothing downstream ever sees the
//! upstream shape.

use futures::future::join_all;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http::build_client;
use crate::source::SourceFetcher;
use crate::types::{SearchResult, SourceDescriptor, UNKNOWN_YEAR};

/// One page of an upstream search response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiPage {
    list: Option<Vec<ApiItem>>,
    pagecount: Option<Value>,
}

impl ApiPage {
    fn page_count(&self) -> u32 {
        self.pagecount
            .as_ref()
            .and_then(value_text)
            .and_then(|count| count.parse().ok())
            .unwrap_or(1)
    }

    fn into_items(self) -> Vec<ApiItem> {
        self.list.unwrap_or_default()
    }
}

/// One upstream record. Numeric fields arrive as numbers or strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiItem {
    vod_id: Option<Value>,
    vod_name: Option<String>,
    vod_pic: Option<String>,
    vod_play_url: Option<String>,
    vod_class: Option<String>,
    vod_year: Option<Value>,
    vod_content: Option<String>,
    type_name: Option<String>,
    vod_douban_id: Option<Value>,
}

/// Queries video-CMS sources over HTTP with a shared keep-alive client.
#[derive(Debug, Clone)]
pub struct HttpSourceFetcher {
    client: reqwest::Client,
    max_pages: u32,
}

impl HttpSourceFetcher {
    /// Create a fetcher with a client built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self::with_client(build_client(config)?, config.max_pages))
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: reqwest::Client, max_pages: u32) -> Self {
        Self {
            client,
            max_pages: max_pages.max(1),
        }
    }

    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        query: &str,
        page: u32,
    ) -> Result<ApiPage, SearchError> {
        let url = search_url(source, query, page)?;
        tracing::debug!(source = %source, page, "requesting source page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("{}: request failed: {e}", source.key)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Http(format!("{}: status {status}", source.key)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("{}: failed to read body: {e}", source.key)))?;

        serde_json::from_str(&body)
            .map_err(|e| SearchError::Parse(format!("{}: invalid search payload: {e}", source.key)))
    }
}

impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(
        &self,
        source: &SourceDescriptor,
        query: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let first = self.fetch_page(source, query, 1).await?;
        let last_page = first.page_count().min(self.max_pages);
        let mut items = first.into_items();

        if last_page > 1 {
            let later = join_all((2..=last_page).map(|page| self.fetch_page(source, query, page))).await;
            for (page, outcome) in (2..=last_page).zip(later) {
                match outcome {
                    Ok(page) => items.extend(page.into_items()),
                    Err(err) => {
                        tracing::warn!(source = %source, page, error = %err, "skipping failed page");
                    }
                }
            }
        }

        let results: Vec<SearchResult> = items
            .into_iter()
            .filter_map(|item| normalize_item(source, item))
            .collect();
        tracing::debug!(source = %source, pages = last_page, count = results.len(), "source parsed");
        Ok(results)
    }
}

fn search_url(source: &SourceDescriptor, query: &str, page: u32) -> Result<Url, SearchError> {
    let mut url = Url::parse(&source.api)
        .map_err(|e| SearchError::Http(format!("{}: invalid api url: {e}", source.key)))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("ac", "videolist").append_pair("wd", query);
        if page > 1 {
            pairs.append_pair("pg", &page.to_string());
        }
    }
    Ok(url)
}

/// Convert one upstream record. Records without a playable episode are dropped.
fn normalize_item(source: &SourceDescriptor, item: ApiItem) -> Option<SearchResult> {
    let (episodes, episodes_titles) = best_play_group(item.vod_play_url.as_deref().unwrap_or_default());
    if episodes.is_empty() {
        return None;
    }

    let year = item
        .vod_year
        .as_ref()
        .and_then(value_text)
        .as_deref()
        .and_then(extract_year)
        .unwrap_or(UNKNOWN_YEAR)
        .to_owned();

    Some(SearchResult {
        id: item.vod_id.as_ref().and_then(value_text).unwrap_or_default(),
        title: collapse_whitespace(item.vod_name.as_deref().unwrap_or_default()),
        poster: item.vod_pic.unwrap_or_default().trim().to_owned(),
        episodes,
        episodes_titles,
        source_key: source.key.clone(),
        source_name: source.name.clone(),
        class: item.vod_class.unwrap_or_default(),
        year,
        desc: strip_html(item.vod_content.as_deref().unwrap_or_default()),
        type_name: item.type_name.unwrap_or_default(),
        douban_id: item
            .vod_douban_id
            .as_ref()
            .and_then(value_text)
            .and_then(|id| id.parse::<u64>().ok())
            .filter(|id| *id != 0),
        duplicate: None,
    })
}

/// Pick the play group with the most `.m3u8` episodes, first on ties.
///
/// Groups are separated by `$$$`, entries by `#`, and each entry is
/// `title$url`. Blank titles fall back to the 1-based episode number.
fn best_play_group(play_url: &str) -> (Vec<String>, Vec<String>) {
    let mut best = (Vec::new(), Vec::new());

    for group in play_url.split("$$$") {
        let mut episodes: Vec<String> = Vec::new();
        let mut titles = Vec::new();

        for entry in group.split('#') {
            let mut parts = entry.split('$');
            let (Some(title), Some(url), None) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            let url = url.trim();
            if !url.ends_with(".m3u8") {
                continue;
            }
            let title = title.trim();
            titles.push(if title.is_empty() {
                (episodes.len() + 1).to_string()
            } else {
                title.to_owned()
            });
            episodes.push(url.to_owned());
        }

        if episodes.len() > best.0.len() {
            best = (episodes, titles);
        }
    }

    best
}

/// First run of four ASCII digits.
fn extract_year(text: &str) -> Option<&str> {
    text.as_bytes()
        .windows(4)
        .position(|window| window.iter().all(u8::is_ascii_digit))
        .map(|start| &text[start..start + 4])
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text of an HTML fragment with entities decoded and whitespace collapsed.
fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
