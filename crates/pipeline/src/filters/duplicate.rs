//! Filter to keep one result per species.

use crate::traits::Filter;
use anyhow::Result;
use std::collections::HashSet;
use strategies::{ScoredCandidate, UserContext};

/// Keeps the first (highest ranked) result of every taxon id.
pub struct DuplicateFilter;

impl Filter for DuplicateFilter {
    fn name(&self) -> &str {
        "DuplicateFilter"
    }

    fn apply(
        &self,
        results: Vec<ScoredCandidate>,
        _context: &UserContext,
    ) -> Result<Vec<ScoredCandidate>> {
        let mut kept = HashSet::new();
        let filtered: Vec<ScoredCandidate> = results
            .into_iter()
            .filter(|result| kept.insert(result.candidate.taxon_id.clone()))
            .collect();
        Ok(filtered)
    }
}
