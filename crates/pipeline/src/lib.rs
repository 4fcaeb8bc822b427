//! Post-ranking filter pipeline for species recommendations.
//!
//! This crate provides:
//! - Filter trait and implementations for scored result filtering
//! - FilterPipeline for composing filters
//!
//! ## Architecture
//! Strategies rank candidates; the pipeline then enforces the guarantees
//! every response must hold, whatever strategy produced it:
//! 1. No species the user has already seen
//! 2. No species twice
//! 3. No species that was not in the request's candidate batch
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::FilterPipeline;
//! use pipeline::filters::*;
//!
//! let pipeline = FilterPipeline::new()
//!     .add_filter(SeenFilter)
//!     .add_filter(DuplicateFilter)
//!     .add_filter(UnknownCandidateFilter);
//!
//! let filtered = pipeline.apply(output.results, &context)?;
//! ```

pub mod filter_pipeline;
pub mod filters;
pub mod traits;

// Re-export main types
pub use filter_pipeline::FilterPipeline;
pub use traits::Filter;
