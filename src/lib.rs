//! vidhub: federated video search server.
//!
//! Serves one search query against many independent video sources at once
//! and returns the merged result set, either as a single JSON response or as
//! a stream of server-sent events while sources settle.
//!
//! # Architecture
//!
//! - **Config**: TOML file with listen address, search tuning, sources and users
//! - **Auth**: bearer token or `auth` cookie resolved to a caller identity
//! - **Registry**: per-user view of the configured sources
//! - **Search**: fan-out, content filter and duplicate grouping from
//!   [`vidhub_search`]
//! - **Server**: `axum` routes for blocking and streaming search

pub mod auth;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;

pub use auth::TokenAuthenticator;
pub use config::{AppConfig, ServerConfig, SourceEntry, UserEntry};
pub use error::{AppError, Result};
pub use registry::ConfigRegistry;
pub use server::SearchServer;
