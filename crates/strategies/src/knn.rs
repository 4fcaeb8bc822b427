//! SimilarityRanker - nearest-neighbour recommendations ("knn")
//!
//! Ranks candidates by how close their attributes are to what the user
//! already likes.
//!
//! ## Algorithm
//! 1. Collect preference tuples: the attributes of every candidate the user
//!    favorited or identified (history order)
//! 2. Without such history, use the candidates matching the user's explicit
//!    groups and families instead
//! 3. One-hot encode the eligible candidates, average the preference vectors
//! 4. Rank candidates by cosine distance to that mean, closest first
//! 5. Keep the `2 x limit` nearest, drop seen ones, score `1 - distance`

use crate::encoder::{FeatureEncoder, FeatureTuple, cosine_distance, feature_tuple, mean_vector};
use crate::error::Result;
use crate::traits::Strategy;
use crate::types::{Algorithm, Candidate, ScoredCandidate, StrategyOutput};
use crate::user_context::{DEFAULT_HISTORY_LIMIT, UserContext};
use async_trait::async_trait;
use interaction_store::{Interaction, InteractionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Nearest-neighbour strategy over one-hot encoded attributes
pub struct SimilarityRanker {
    store: Arc<dyn InteractionStore>,

    /// How many history entries to read for the user
    history_limit: usize,

    /// Neighbours examined per requested result, before seen filtering
    neighbor_factor: usize,
}

impl SimilarityRanker {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self {
            store,
            history_limit: DEFAULT_HISTORY_LIMIT,
            neighbor_factor: 2,
        }
    }

    /// Configure how many history entries are read (default: 100)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Configure neighbours examined per requested result (default: 2)
    pub fn with_neighbor_factor(mut self, factor: usize) -> Self {
        self.neighbor_factor = factor.max(1);
        self
    }

    /// Rank the context's candidates against an already fetched history.
    pub fn rank(&self, context: &UserContext, history: &[Interaction]) -> StrategyOutput {
        let eligible = context.eligible_candidates();
        if eligible.is_empty() {
            return StrategyOutput::empty("No valid candidates");
        }

        let preferences = preference_tuples(context, &eligible, history);
        if preferences.is_empty() {
            debug!("No preference signal, falling back to unranked candidates");
            let results = eligible
                .into_iter()
                .filter(|c| !context.is_seen(&c.taxon_id))
                .take(context.limit)
                .map(|c| ScoredCandidate::new(c.clone(), 0.0, Algorithm::Knn))
                .collect();
            return StrategyOutput::new(results, "No preference signal, returning unranked species");
        }

        let encoder = FeatureEncoder::fit(eligible.iter().copied());
        let vectors = encoder.encode_all(&eligible);
        let preference_vectors: Vec<Vec<f64>> =
            preferences.iter().map(|tuple| encoder.encode(tuple)).collect();
        let Some(centroid) = mean_vector(&preference_vectors) else {
            return StrategyOutput::empty("No preference signal");
        };

        let mut neighbours: Vec<(usize, f64)> = vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, cosine_distance(&centroid, vector)))
            .collect();
        // Stable: equal distances keep candidate order
        neighbours.sort_by(|a, b| a.1.total_cmp(&b.1));
        neighbours.truncate(context.limit.saturating_mul(self.neighbor_factor));

        let results: Vec<ScoredCandidate> = neighbours
            .into_iter()
            .filter(|(idx, _)| !context.is_seen(&eligible[*idx].taxon_id))
            .take(context.limit)
            .map(|(idx, distance)| {
                ScoredCandidate::new(
                    eligible[idx].clone(),
                    (1.0 - distance).max(0.0),
                    Algorithm::Knn,
                )
            })
            .collect();

        debug!(
            "Ranked {} knn results from {} preferences",
            results.len(),
            preferences.len()
        );
        StrategyOutput::new(
            results,
            format!("Based on {} preferences", preferences.len()),
        )
    }
}

#[async_trait]
impl Strategy for SimilarityRanker {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Knn
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
                warn!("History unavailable for knn, using explicit preferences: {}", e);
                Vec::new()
            }
        };
        Ok(self.rank(context, &history))
    }
}

/// Attribute tuples describing what the user likes.
///
/// One tuple per strong interaction that matches an eligible candidate; when
/// there are none, one per eligible candidate matching an explicit preference.
fn preference_tuples<'a>(
    context: &UserContext,
    eligible: &[&'a Candidate],
    history: &[Interaction],
) -> Vec<FeatureTuple<'a>> {
    let mut by_taxon: HashMap<&str, &'a Candidate> = HashMap::new();
    for candidate in eligible {
        by_taxon.entry(candidate.taxon_id.as_str()).or_insert(*candidate);
    }

    let from_history: Vec<FeatureTuple<'a>> = history
        .iter()
        .filter(|i| i.kind.is_strong_signal())
        .filter_map(|i| by_taxon.get(i.taxon_id.as_str()).copied())
        .map(feature_tuple)
        .collect();
    if !from_history.is_empty() {
        return from_history;
    }

    eligible
        .iter()
        .filter(|c| context.matches_explicit_preference(c))
        .map(|candidate| feature_tuple(*candidate))
        .collect()
}
