//! Filter to remove species the user has already seen.
//!
//! This is the first filter in the standard pipeline; a seen species must
//! never be recommended, whichever strategy ranked it.

use crate::traits::Filter;
use anyhow::Result;
use strategies::{ScoredCandidate, UserContext};

/// Removes results whose taxon id is in the context's seen set.
///
/// ## Algorithm
/// Uses the HashSet in UserContext.seen_taxon_ids for O(1) lookups.
pub struct SeenFilter;

impl Filter for SeenFilter {
    fn name(&self) -> &str {
        "SeenFilter"
    }

    fn apply(
        &self,
        results: Vec<ScoredCandidate>,
        context: &UserContext,
    ) -> Result<Vec<ScoredCandidate>> {
        let filtered: Vec<ScoredCandidate> = results
            .into_iter()
            .filter(|result| !context.is_seen(result.taxon_id()))
            .collect();
        Ok(filtered)
    }
}
