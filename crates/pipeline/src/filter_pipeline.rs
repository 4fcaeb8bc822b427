//! The FilterPipeline orchestrates multiple filters.
//!
//! This module provides the main FilterPipeline struct that chains
//! multiple filters together using the builder pattern.

use crate::filters::{DuplicateFilter, SeenFilter, UnknownCandidateFilter};
use crate::traits::Filter;
use anyhow::Result;
use strategies::{ScoredCandidate, UserContext};

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(SeenFilter)
///     .add_filter(DuplicateFilter);
///
/// let filtered = pipeline.apply(results, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// The filters every recommendation response goes through
    pub fn standard() -> Self {
        Self::new()
            .add_filter(SeenFilter)
            .add_filter(DuplicateFilter)
            .add_filter(UnknownCandidateFilter)
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Names of the filters, in application order
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Apply all filters in sequence to the results.
    ///
    /// # Returns
    /// * `Ok(Vec<ScoredCandidate>)` - The results kept by every filter
    /// * `Err` - If any filter fails
    pub fn apply(
        &self,
        results: Vec<ScoredCandidate>,
        context: &UserContext,
    ) -> Result<Vec<ScoredCandidate>> {
        let mut current = results;
        for filter in &self.filters {
            tracing::debug!(
                "Applying filter: {} (input count: {})",
                filter.name(),
                current.len()
            );
            current = filter.apply(current, context)?;
            tracing::debug!(
                "Filter applied: {} (output count: {})",
                filter.name(),
                current.len()
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategies::{Algorithm, Candidate};

    fn scored(id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(Candidate::new(id), score, Algorithm::Knn)
    }

    fn create_test_context() -> UserContext {
        let candidates = ["1", "2", "3"].into_iter().map(Candidate::new).collect();
        UserContext::new("u1", candidates, 10)
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let context = create_test_context();

        let results = vec![scored("1", 0.9), scored("2", 0.8)];
        let filtered = pipeline.apply(results, &context).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_single_filter() {
        let context = create_test_context().with_seen(["1"]);
        let pipeline = FilterPipeline::new().add_filter(SeenFilter);

        let results = vec![scored("1", 0.9), scored("2", 0.8)];
        let filtered = pipeline.apply(results, &context).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].taxon_id(), "2");
    }

    #[test]
    fn test_standard_pipeline() {
        let pipeline = FilterPipeline::standard();
        assert_eq!(
            pipeline.filter_names(),
            vec!["SeenFilter", "DuplicateFilter", "UnknownCandidateFilter"]
        );

        let context = create_test_context().with_seen(["3"]);
        let results = vec![
            scored("3", 0.9),
            scored("2", 0.8),
            scored("99", 0.7),
            scored("2", 0.6),
            scored("1", 0.5),
        ];
        let filtered = pipeline.apply(results, &context).unwrap();
        let ids: Vec<&str> = filtered.iter().map(|r| r.taxon_id()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(filtered[0].score, 0.8);
    }
}
