//! Duplicate grouping across sources by title similarity.
//!
//! Unlike a merge, grouping never drops a result: every input item is
//! emitted exactly once, either unannotated (no duplicate found) or as a
//! member of a duplicate group carrying a [`DuplicateInfo`] annotation.
//! Provenance of every member is preserved in `all_sources`.

use crate::types::{DuplicateInfo, SearchResult, SourceSummary};

use super::similarity::similarity;

/// Minimum title similarity for two results to be considered the same title.
///
/// Strict on purpose: sequels and differently named shows that share many
/// words must stay apart.
pub const DUPLICATE_THRESHOLD: f64 = 0.90;

/// Group near-identical results and annotate the groups.
///
/// # Algorithm
///
/// 1. Walk the results in input order, skipping those already claimed.
/// 2. Each unclaimed result opens a group and claims every later unclaimed
///    result whose title similarity is at least [`DUPLICATE_THRESHOLD`] and
///    whose year is compatible (equal, or unknown on either side).
///    Candidates are compared against the group's seed only, never against
///    the other members, so a seed with an unknown year can gather members
///    whose years differ from each other.
/// 3. Singleton groups are emitted unchanged.
/// 4. Larger groups are stably sorted by episode count (descending); the
///    first member becomes primary. All members share a 1-based group id
///    assigned in discovery order and carry the group's `all_sources` in
///    discovery order.
///
/// Output length always equals input length. Any annotation already present
/// on the input is discarded first, so running this on its own output yields
/// the same grouping.
pub fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }

    let groups = group_indices(&results);
    let mut slots: Vec<Option<SearchResult>> = results
        .into_iter()
        .map(|mut result| {
            result.duplicate = None;
            Some(result)
        })
        .collect();

    let mut output = Vec::with_capacity(slots.len());
    let mut group_id = 0;

    for members in groups {
        let mut group: Vec<SearchResult> = members
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        if group.len() == 1 {
            output.extend(group);
            continue;
        }

        group_id += 1;
        let all_sources: Vec<SourceSummary> = group.iter().map(SourceSummary::from).collect();
        let duplicate_count = group.len();

        // Stable: equal episode counts keep discovery order.
        group.sort_by(|a, b| b.episode_count().cmp(&a.episode_count()));

        for (position, mut result) in group.into_iter().enumerate() {
            result.duplicate = Some(DuplicateInfo {
                duplicate_group: group_id,
                is_primary: position == 0,
                duplicate_count,
                all_sources: all_sources.clone(),
            });
            output.push(result);
        }
    }

    tracing::debug!(
        input = output.len(),
        groups = group_id,
        "duplicate grouping complete"
    );

    output
}

/// Whether two results may belong to the same group.
pub fn is_duplicate(a: &SearchResult, b: &SearchResult) -> bool {
    similarity(&a.title, &b.title) >= DUPLICATE_THRESHOLD && years_compatible(a, b)
}

/// Years are compared only when both sides report a real year.
fn years_compatible(a: &SearchResult, b: &SearchResult) -> bool {
    match (a.known_year(), b.known_year()) {
        (Some(year_a), Some(year_b)) => year_a == year_b,
        _ => true,
    }
}

/// Partition indices into groups in discovery order.
fn group_indices(results: &[SearchResult]) -> Vec<Vec<usize>> {
    let mut claimed = vec![false; results.len()];
    let mut groups = Vec::new();

    for i in 0..results.len() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut group = vec![i];

        for j in (i + 1)..results.len() {
            if !claimed[j] && is_duplicate(&results[i], &results[j]) {
                claimed[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }

    groups
}
