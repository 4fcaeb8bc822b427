//! Core domain types for user interactions and recommendation feedback.
//!
//! Interactions are append-only records of what a user did with a species
//! (viewed it, favorited it, identified it from a photo, searched for it).
//! Feedback records how a user reacted to a recommendation and which
//! algorithm produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of an application user
pub type UserId = String;

/// Identifier of a species in the taxonomy service
pub type TaxonId = String;

// =============================================================================
// Interactions
// =============================================================================

/// What the user did with a species.
///
/// Stored kinds outside the known set deserialize to `Unknown` so that a
/// history written by a newer client never breaks scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Favorite,
    Identify,
    Search,
    #[serde(other)]
    Unknown,
}

impl InteractionKind {
    /// `favorite` and `identify` are explicit positive preference evidence.
    pub fn is_strong_signal(self) -> bool {
        matches!(self, InteractionKind::Favorite | InteractionKind::Identify)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Favorite => "favorite",
            InteractionKind::Identify => "identify",
            InteractionKind::Search => "search",
            InteractionKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = StoreError;

    /// Strict parse used on write paths: `unknown` is not a recordable kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(InteractionKind::View),
            "favorite" => Ok(InteractionKind::Favorite),
            "identify" => Ok(InteractionKind::Identify),
            "search" => Ok(InteractionKind::Search),
            _ => Err(StoreError::InvalidValue {
                field: "interaction_type".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// A single user interaction with a species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "InteractionRecord", into = "InteractionRecord")]
pub struct Interaction {
    pub user_id: UserId,
    pub taxon_id: TaxonId,
    pub kind: InteractionKind,
    /// Classifier confidence, for `identify` interactions
    pub confidence: Option<f64>,
    /// When the interaction happened. The store stamps missing values on write.
    pub timestamp: Option<DateTime<Utc>>,
    /// Stored type name behind an `Unknown` kind, written back unchanged
    unknown_kind: Option<String>,
}

impl Interaction {
    pub fn new(
        user_id: impl Into<UserId>,
        taxon_id: impl Into<TaxonId>,
        kind: InteractionKind,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            taxon_id: taxon_id.into(),
            kind,
            confidence: None,
            timestamp: None,
            unknown_kind: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Type name as stored: the raw name for kinds outside the known set
    pub fn kind_name(&self) -> &str {
        match &self.unknown_kind {
            Some(name) => name,
            None => self.kind.as_str(),
        }
    }
}

/// Wire shape of [`Interaction`], one JSON object per stored line
#[derive(Serialize, Deserialize)]
struct InteractionRecord {
    user_id: UserId,
    taxon_id: TaxonId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl From<InteractionRecord> for Interaction {
    fn from(record: InteractionRecord) -> Self {
        let kind = match record.kind.as_str() {
            "view" => InteractionKind::View,
            "favorite" => InteractionKind::Favorite,
            "identify" => InteractionKind::Identify,
            "search" => InteractionKind::Search,
            _ => InteractionKind::Unknown,
        };
        let unknown_kind = (kind == InteractionKind::Unknown).then_some(record.kind);
        Self {
            user_id: record.user_id,
            taxon_id: record.taxon_id,
            kind,
            confidence: record.confidence,
            timestamp: record.timestamp,
            unknown_kind,
        }
    }
}

impl From<Interaction> for InteractionRecord {
    fn from(interaction: Interaction) -> Self {
        let kind = interaction
            .unknown_kind
            .unwrap_or_else(|| interaction.kind.as_str().to_string());
        Self {
            user_id: interaction.user_id,
            taxon_id: interaction.taxon_id,
            kind,
            confidence: interaction.confidence,
            timestamp: interaction.timestamp,
        }
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// How the user reacted to a recommended species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Liked,
    Disliked,
    NotRelevant,
    AlreadyKnown,
}

impl FeedbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::Liked => "liked",
            FeedbackKind::Disliked => "disliked",
            FeedbackKind::NotRelevant => "not_relevant",
            FeedbackKind::AlreadyKnown => "already_known",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "liked" => Ok(FeedbackKind::Liked),
            "disliked" => Ok(FeedbackKind::Disliked),
            "not_relevant" => Ok(FeedbackKind::NotRelevant),
            "already_known" => Ok(FeedbackKind::AlreadyKnown),
            _ => Err(StoreError::InvalidValue {
                field: "feedback_type".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Feedback on one recommended species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub user_id: UserId,
    pub recommended_taxon_id: TaxonId,
    pub feedback_type: FeedbackKind,
    pub algorithm_used: String,
}

impl Feedback {
    pub fn new(
        user_id: impl Into<UserId>,
        recommended_taxon_id: impl Into<TaxonId>,
        feedback_type: FeedbackKind,
        algorithm_used: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            recommended_taxon_id: recommended_taxon_id.into(),
            feedback_type,
            algorithm_used: algorithm_used.into(),
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Interaction count for one species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesPopularity {
    pub taxon_id: TaxonId,
    pub interactions: usize,
}

/// Aggregate statistics over every stored interaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionStats {
    pub total_interactions: usize,
    pub unique_users: usize,
    pub interaction_types: BTreeMap<InteractionKind, usize>,
    /// Most interacted-with species, highest count first
    pub top_species: Vec<SpeciesPopularity>,
    pub average_interactions_per_user: f64,
}
