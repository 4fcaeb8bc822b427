//! Shared types for recommendation strategies.
//!
//! A [`Candidate`] is one species offered for ranking in a request. Every
//! strategy turns the request's candidates into [`ScoredCandidate`]s, tagged
//! with the [`Algorithm`] that produced them.

use crate::error::RecommendError;
use interaction_store::TaxonId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel used for a missing categorical attribute
pub const MISSING_VALUE: &str = "None";

/// A species offered for ranking.
///
/// Attributes the engine does not score on (names, image urls...) are kept in
/// `extra` and written back verbatim in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub taxon_id: TaxonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habitat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_type: Option<String>,
    #[serde(default)]
    pub rarity_score: f64,
    /// Photo quality in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    pub fn new(taxon_id: impl Into<TaxonId>) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            group: None,
            family: None,
            habitat: None,
            observation_type: None,
            rarity_score: 0.0,
            image_quality: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn with_habitat(mut self, habitat: impl Into<String>) -> Self {
        self.habitat = Some(habitat.into());
        self
    }

    pub fn with_observation_type(mut self, observation_type: impl Into<String>) -> Self {
        self.observation_type = Some(observation_type.into());
        self
    }

    pub fn with_rarity_score(mut self, rarity_score: f64) -> Self {
        self.rarity_score = rarity_score;
        self
    }

    pub fn with_image_quality(mut self, image_quality: f64) -> Self {
        self.image_quality = Some(image_quality);
        self
    }

    /// Group, treating an empty string as missing
    pub fn group(&self) -> Option<&str> {
        non_empty(&self.group)
    }

    /// Family, treating an empty string as missing
    pub fn family(&self) -> Option<&str> {
        non_empty(&self.family)
    }

    pub fn habitat(&self) -> Option<&str> {
        non_empty(&self.habitat)
    }

    pub fn observation_type(&self) -> Option<&str> {
        non_empty(&self.observation_type)
    }

    /// Only candidates with a group take part in knn and content scoring.
    pub fn is_eligible(&self) -> bool {
        self.group().is_some()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Recommendation algorithm selected by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Knn,
    Content,
    Collaborative,
    Hybrid,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Knn,
        Algorithm::Content,
        Algorithm::Collaborative,
        Algorithm::Hybrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Knn => "knn",
            Algorithm::Content => "content",
            Algorithm::Collaborative => "collaborative",
            Algorithm::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "knn" => Ok(Algorithm::Knn),
            "content" => Ok(Algorithm::Content),
            "collaborative" => Ok(Algorithm::Collaborative),
            "hybrid" => Ok(Algorithm::Hybrid),
            _ => Err(RecommendError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Where the user is, when the client shares it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
}

/// A candidate with the score one strategy gave it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Raw, unrounded score. Never negative.
    pub score: f64,
    pub algorithm: Algorithm,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, score: f64, algorithm: Algorithm) -> Self {
        Self {
            candidate,
            score,
            algorithm,
        }
    }

    pub fn taxon_id(&self) -> &str {
        &self.candidate.taxon_id
    }
}

/// Ranked list produced by one strategy, plus a human-readable explanation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub results: Vec<ScoredCandidate>,
    pub explanation: String,
}

impl StrategyOutput {
    pub fn new(results: Vec<ScoredCandidate>, explanation: impl Into<String>) -> Self {
        Self {
            results,
            explanation: explanation.into(),
        }
    }

    pub fn empty(explanation: impl Into<String>) -> Self {
        Self::new(Vec::new(), explanation)
    }
}

/// Sort by score descending. The sort is stable, so equal scores keep their
/// incoming order.
pub fn sort_by_score_desc(results: &mut [ScoredCandidate]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}
