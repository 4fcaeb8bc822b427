//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "peer_concurrency": 8, "hybrid": { "knn": { "weight": 0.5, "boost": 0.5 } } }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use strategies::collaborative::{DEFAULT_MIN_SIMILARITY, DEFAULT_PEER_CONCURRENCY};
use strategies::user_context::DEFAULT_HISTORY_LIMIT;
use strategies::{ContentWeights, HybridWeights, InteractionWeights};
use thiserror::Error;

/// Errors that can occur while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Tunables of the recommendation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// History entries read per user
    pub history_limit: usize,
    /// Peer histories fetched concurrently by the collaborative strategy
    pub peer_concurrency: usize,
    /// Users processed concurrently in batch mode
    pub batch_concurrency: usize,
    /// Jaccard similarity a peer must exceed
    pub min_peer_similarity: f64,
    /// Result count when a request does not set one
    pub default_limit: usize,
    /// Result count per user in batch mode
    pub batch_limit: usize,
    /// Deadline for a single request; none by default
    pub request_timeout_ms: Option<u64>,
    pub interaction_weights: InteractionWeights,
    pub content: ContentWeights,
    pub hybrid: HybridWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            peer_concurrency: DEFAULT_PEER_CONCURRENCY,
            batch_concurrency: 4,
            min_peer_similarity: DEFAULT_MIN_SIMILARITY,
            default_limit: 10,
            batch_limit: 5,
            request_timeout_ms: None,
            interaction_weights: InteractionWeights::default(),
            content: ContentWeights::default(),
            hybrid: HybridWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let label = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: label.clone(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: label,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("history_limit", self.history_limit),
            ("peer_concurrency", self.peer_concurrency),
            ("batch_concurrency", self.batch_concurrency),
            ("batch_limit", self.batch_limit),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.min_peer_similarity) {
            return Err(ConfigError::InvalidValue {
                field: "min_peer_similarity",
                reason: format!("{} is outside [0, 1]", self.min_peer_similarity),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.peer_concurrency, 16);
        assert_eq!(config.batch_limit, 5);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.hybrid.content.weight, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"peer_concurrency": 4, "interaction_weights": {"view": 0.5}, "request_timeout_ms": 250}"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.peer_concurrency, 4);
        assert_eq!(config.interaction_weights.view, 0.5);
        assert_eq!(config.interaction_weights.favorite, 3.0);
        assert_eq!(config.request_timeout_ms, Some(250));
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"batch_concurrency": 0}"#).unwrap();

        let err = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "batch_concurrency", .. }
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/engine.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
