//! InteractionWeigher - content-based recommendations ("content")
//!
//! Scores candidates by how much weight the user's history puts on their
//! group and family.
//!
//! ## Algorithm
//! 1. Weight every history interaction by kind (favorite 3.0, identify 2.0,
//!    search 1.5, view 1.0)
//! 2. Sum the weights per group and per family of the matching candidates
//! 3. Score each unseen eligible candidate from its group and family sums,
//!    falling back to fixed bonuses for explicit preferences
//! 4. Add bonuses for rare species and good photos

use crate::error::Result;
use crate::traits::Strategy;
use crate::types::{Algorithm, Candidate, ScoredCandidate, StrategyOutput, sort_by_score_desc};
use crate::user_context::{DEFAULT_HISTORY_LIMIT, UserContext};
use async_trait::async_trait;
use interaction_store::{Interaction, InteractionKind, InteractionStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Weight of each interaction kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionWeights {
    pub favorite: f64,
    pub identify: f64,
    pub search: f64,
    pub view: f64,
    /// Kinds outside the known set
    pub unknown: f64,
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            favorite: 3.0,
            identify: 2.0,
            search: 1.5,
            view: 1.0,
            unknown: 1.0,
        }
    }
}

impl InteractionWeights {
    pub fn weight(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::Favorite => self.favorite,
            InteractionKind::Identify => self.identify,
            InteractionKind::Search => self.search,
            InteractionKind::View => self.view,
            InteractionKind::Unknown => self.unknown,
        }
    }
}

/// Factors and bonuses of the content score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentWeights {
    pub group_factor: f64,
    pub family_factor: f64,
    /// Added when the group has no history weight but is an explicit preference
    pub group_preference_bonus: f64,
    pub family_preference_bonus: f64,
    pub rarity_threshold: f64,
    pub rarity_bonus: f64,
    pub image_quality_threshold: f64,
    pub image_quality_bonus: f64,
}

impl Default for ContentWeights {
    fn default() -> Self {
        Self {
            group_factor: 0.4,
            family_factor: 0.6,
            group_preference_bonus: 2.0,
            family_preference_bonus: 1.5,
            rarity_threshold: 0.7,
            rarity_bonus: 1.0,
            image_quality_threshold: 0.8,
            image_quality_bonus: 0.5,
        }
    }
}

/// Summed interaction weight per group and per family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeWeights {
    pub groups: HashMap<String, f64>,
    pub families: HashMap<String, f64>,
}

impl AttributeWeights {
    /// Accumulate history weights onto the attributes of matching candidates
    pub fn from_history(
        history: &[Interaction],
        eligible: &[&Candidate],
        weights: &InteractionWeights,
    ) -> Self {
        let mut by_taxon: HashMap<&str, &Candidate> = HashMap::new();
        for candidate in eligible {
            by_taxon.entry(candidate.taxon_id.as_str()).or_insert(*candidate);
        }

        let mut totals = AttributeWeights::default();
        for interaction in history {
            let Some(candidate) = by_taxon.get(interaction.taxon_id.as_str()) else {
                continue;
            };
            let weight = weights.weight(interaction.kind);
            if let Some(group) = candidate.group() {
                *totals.groups.entry(group.to_string()).or_insert(0.0) += weight;
            }
            if let Some(family) = candidate.family() {
                *totals.families.entry(family.to_string()).or_insert(0.0) += weight;
            }
        }
        totals
    }
}

/// Content-based strategy weighting the user's interactions by kind
pub struct InteractionWeigher {
    store: Arc<dyn InteractionStore>,
    history_limit: usize,
    interaction_weights: InteractionWeights,
    content_weights: ContentWeights,
}

impl InteractionWeigher {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self {
            store,
            history_limit: DEFAULT_HISTORY_LIMIT,
            interaction_weights: InteractionWeights::default(),
            content_weights: ContentWeights::default(),
        }
    }

    /// Configure how many history entries are read (default: 100)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_interaction_weights(mut self, weights: InteractionWeights) -> Self {
        self.interaction_weights = weights;
        self
    }

    pub fn with_content_weights(mut self, weights: ContentWeights) -> Self {
        self.content_weights = weights;
        self
    }

    /// Score one candidate against the accumulated attribute weights
    pub fn score_candidate(
        &self,
        context: &UserContext,
        totals: &AttributeWeights,
        candidate: &Candidate,
    ) -> f64 {
        let w = &self.content_weights;
        let mut score = 0.0;

        if let Some(group) = candidate.group() {
            if let Some(weight) = totals.groups.get(group) {
                score += weight * w.group_factor;
            } else if context.user_groups.contains(group) {
                score += w.group_preference_bonus;
            }
        }

        if let Some(family) = candidate.family() {
            if let Some(weight) = totals.families.get(family) {
                score += weight * w.family_factor;
            } else if context.user_families.contains(family) {
                score += w.family_preference_bonus;
            }
        }

        if candidate.rarity_score > w.rarity_threshold {
            score += w.rarity_bonus;
        }
        if candidate.image_quality.unwrap_or(0.0) > w.image_quality_threshold {
            score += w.image_quality_bonus;
        }

        score.max(0.0)
    }

    /// Rank the context's candidates against an already fetched history.
    pub fn rank(&self, context: &UserContext, history: &[Interaction]) -> StrategyOutput {
        let eligible = context.eligible_candidates();
        let totals = AttributeWeights::from_history(history, &eligible, &self.interaction_weights);

        let mut results: Vec<ScoredCandidate> = eligible
            .into_iter()
            .filter(|c| !context.is_seen(&c.taxon_id))
            .map(|c| {
                let score = self.score_candidate(context, &totals, c);
                ScoredCandidate::new(c.clone(), score, Algorithm::Content)
            })
            .collect();

        sort_by_score_desc(&mut results);
        results.truncate(context.limit);

        debug!(
            "Scored content results from {} groups and {} families",
            totals.groups.len(),
            totals.families.len()
        );
        StrategyOutput::new(
            results,
            format!("Based on {} past interactions", history.len()),
        )
    }
}

#[async_trait]
impl Strategy for InteractionWeigher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Content
    }

    #[instrument(skip(self, context), fields(user_id = %context.user_id))]
    async fn score(&self, context: &UserContext) -> Result<StrategyOutput> {
        let history = match self
            .store
            .list_interactions(&context.user_id, self.history_limit)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!("History unavailable for content scoring: {}", e);
                Vec::new()
            }
        };
        Ok(self.rank(context, &history))
    }
}
