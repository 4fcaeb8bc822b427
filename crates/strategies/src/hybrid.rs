//! HybridBlender - weighted blend of other strategies ("hybrid")
//!
//! Runs every component strategy on the same context, then merges their
//! ranked lists. A species collects, from each component list it appears in,
//! `weight x score` plus a position boost that decays linearly with rank:
//! rank `i` of a list of `n` earns `(n - i) / n x boost`.

use crate::error::Result;
use crate::traits::Strategy;
use crate::types::{Algorithm, ScoredCandidate, StrategyOutput, sort_by_score_desc};
use crate::user_context::UserContext;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Weight and position boost of one blended component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeight {
    pub weight: f64,
    pub boost: f64,
}

impl BlendWeight {
    pub const fn new(weight: f64, boost: f64) -> Self {
        Self { weight, boost }
    }
}

/// Blend weights of the three standard components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub knn: BlendWeight,
    pub content: BlendWeight,
    pub collaborative: BlendWeight,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            knn: BlendWeight::new(0.3, 0.5),
            content: BlendWeight::new(0.4, 0.3),
            collaborative: BlendWeight::new(0.3, 0.2),
        }
    }
}

/// One strategy taking part in the blend
#[derive(Clone)]
pub struct BlendComponent {
    pub strategy: Arc<dyn Strategy>,
    pub weight: BlendWeight,
}

impl BlendComponent {
    pub fn new(strategy: Arc<dyn Strategy>, weight: BlendWeight) -> Self {
        Self { strategy, weight }
    }
}

/// Merge ranked component lists into one hybrid ranking.
///
/// Output follows candidate order before a stable sort by blended score, so
/// ties keep the order of the request. Seen species are dropped.
pub fn blend(
    context: &UserContext,
    lists: &[(BlendWeight, &[ScoredCandidate])],
) -> Vec<ScoredCandidate> {
    let mut combined: HashMap<&str, f64> = HashMap::new();

    for (weight, results) in lists {
        let n = results.len() as f64;
        for (rank, result) in results.iter().enumerate() {
            let position_boost = (n - rank as f64) / n * weight.boost;
            *combined.entry(result.taxon_id()).or_insert(0.0) +=
                weight.weight * result.score + position_boost;
        }
    }

    let mut blended: Vec<ScoredCandidate> = context
        .candidates
        .iter()
        .filter(|c| !context.is_seen(&c.taxon_id))
        .filter_map(|c| {
            combined
                .get(c.taxon_id.as_str())
                .map(|&score| ScoredCandidate::new(c.clone(), score.max(0.0), Algorithm::Hybrid))
        })
        .collect();

    sort_by_score_desc(&mut blended);
    blended.truncate(context.limit);
    blended
}

/// Hybrid strategy over a list of weighted components
#[derive(Clone, Default)]
pub struct HybridBlender {
    components: Vec<BlendComponent>,
}

impl HybridBlender {
    pub fn new(components: Vec<BlendComponent>) -> Self {
        Self { components }
    }

    /// Add a component to the blend
    pub fn with_component(mut self, strategy: Arc<dyn Strategy>, weight: BlendWeight) -> Self {
        self.components.push(BlendComponent::new(strategy, weight));
        self
    }

    pub fn components(&self) -> &[BlendComponent] {
        &self.components
    }
}

#[async_trait]
impl Strategy for HybridBlender {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Hybrid
    }

    #[instrument(skip(self, context), fields(user_id = %context.user_id))]
    async fn score(&self, context: &UserContext) -> Result<StrategyOutput> {
        let outputs = join_all(
            self.components
                .iter()
                .map(|component| component.strategy.score(context)),
        )
        .await;

        let lists: Vec<(Algorithm, BlendWeight, Vec<ScoredCandidate>)> = self
            .components
            .iter()
            .zip(outputs)
            .map(|(component, output)| {
                let algorithm = component.strategy.algorithm();
                let results = match output {
                    Ok(output) => output.results,
                    Err(e) => {
                        warn!("{} component failed, blending without it: {}", algorithm, e);
                        Vec::new()
                    }
                };
                (algorithm, component.weight, results)
            })
            .collect();

        let weighted: Vec<(BlendWeight, &[ScoredCandidate])> = lists
            .iter()
            .map(|(_, weight, results)| (*weight, results.as_slice()))
            .collect();
        let results = blend(context, &weighted);

        let sizes: Vec<String> = lists
            .iter()
            .map(|(algorithm, _, results)| format!("{} ({})", algorithm, results.len()))
            .collect();
        debug!("Blended {} hybrid results", results.len());

        Ok(StrategyOutput::new(
            results,
            format!("Combination of {}", sizes.join(", ")),
        ))
    }
}
