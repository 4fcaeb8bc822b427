//! Engine crate for the species recommendation service.
//!
//! This crate contains the engine that validates requests, dispatches them
//! to the recommendation strategies, and serves batch mode, the write paths
//! and feedback analytics.

pub mod analytics;
pub mod config;
pub mod orchestrator;

pub use analytics::{AlgorithmPerformance, UserInsights};
pub use config::{ConfigError, EngineConfig};
pub use orchestrator::{
    BatchOutcome, BatchRequest, BatchResponse, RecommendationEngine, RecommendationRequest,
    RecommendationResponse, RecommendedSpecies,
};
