//! Core traits for the filtering pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to ranked results.

use anyhow::Result;
use strategies::{ScoredCandidate, UserContext};

/// Core trait for filtering ranked results.
///
/// All filters must implement this trait to be used in the FilterPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows filters to be shared across concurrent requests
/// - Filters take ownership of the results and return the kept ones
/// - Filters must preserve the relative order of the results they keep
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to ranked results.
    ///
    /// # Arguments
    /// * `results` - The ranked results to filter (takes ownership)
    /// * `context` - The request context the results were ranked for
    fn apply(
        &self,
        results: Vec<ScoredCandidate>,
        context: &UserContext,
    ) -> Result<Vec<ScoredCandidate>>;
}
