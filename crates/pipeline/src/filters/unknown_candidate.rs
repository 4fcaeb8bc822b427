//! Filter to drop results that were not offered as candidates.
//!
//! Collaborative scores come from other users' histories, which may name
//! species outside the request's batch. Only offered species may be returned.

use crate::traits::Filter;
use anyhow::Result;
use std::collections::HashSet;
use strategies::{ScoredCandidate, UserContext};

/// Removes results whose taxon id is not in the context's candidate batch.
pub struct UnknownCandidateFilter;

impl Filter for UnknownCandidateFilter {
    fn name(&self) -> &str {
        "UnknownCandidateFilter"
    }

    fn apply(
        &self,
        results: Vec<ScoredCandidate>,
        context: &UserContext,
    ) -> Result<Vec<ScoredCandidate>> {
        let offered: HashSet<&str> = context
            .candidates
            .iter()
            .map(|c| c.taxon_id.as_str())
            .collect();

        let filtered: Vec<ScoredCandidate> = results
            .into_iter()
            .filter(|result| offered.contains(result.taxon_id()))
            .collect();
        Ok(filtered)
    }
}
