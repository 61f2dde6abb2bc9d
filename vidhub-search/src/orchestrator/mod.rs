//! Search orchestrator: concurrent per-source fan-out, content filtering and
//! duplicate grouping.
//!
//! This module fans a query out to every enabled source with an independent
//! deadline, gathers settled results in blocking or streaming form, drops
//! results excluded by the content policy and groups near-identical titles
//! across sources.

pub mod dedup;
pub mod filter;
pub mod search;
pub mod similarity;
