//! Filter implementations for the result pipeline.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline.

pub mod duplicate;
pub mod seen;
pub mod unknown_candidate;

// Re-export for convenience
pub use duplicate::DuplicateFilter;
pub use seen::SeenFilter;
pub use unknown_candidate::UnknownCandidateFilter;
