//! Error types for recommendation requests.

use crate::types::Algorithm;
use interaction_store::StoreError;
use thiserror::Error;

/// Errors returned by strategies and by the recommendation engine
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The request was rejected before any scoring happened
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested algorithm name is not one of knn, content, collaborative, hybrid
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The interaction store failed on a path that cannot degrade
    #[error("Store failure: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// An explicitly requested algorithm cannot run right now
    #[error("{algorithm} recommendations unavailable: {reason}")]
    ServiceDegraded { algorithm: Algorithm, reason: String },

    /// The request did not finish within the configured deadline
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommendError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        RecommendError::InvalidRequest(reason.into())
    }

    /// Input errors are the caller's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RecommendError::InvalidRequest(_) | RecommendError::UnsupportedAlgorithm(_)
        )
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RecommendError>;
