//! # Recommendation Engine
//!
//! This module coordinates a recommendation request end to end:
//! 1. Validate the request
//! 2. Build the user context
//! 3. Run the selected strategy (hybrid runs all three)
//! 4. Apply the filter pipeline
//! 5. Trim to the limit and round scores for presentation
//!
//! It also owns the write paths (interactions, feedback), batch mode and
//! the analytics built on stored feedback and history.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use interaction_store::{Feedback, FeedbackStore, Interaction, InteractionStore, TaxonId, UserId};
use pipeline::FilterPipeline;
use strategies::{
    Algorithm, Candidate, HybridBlender, ImplicitPreferences, InteractionWeigher, PeerSimilarity,
    RecommendError, Result, ScoredCandidate, SimilarityRanker, Strategy, UserContext,
    UserLocation,
};

use crate::analytics::{self, AlgorithmPerformance, UserInsights, round_to};
use crate::config::EngineConfig;

fn default_algorithm() -> String {
    Algorithm::Hybrid.as_str().to_string()
}

/// A single recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub user_groups: Vec<String>,
    #[serde(default)]
    pub user_families: Vec<String>,
    #[serde(default)]
    pub seen_taxon_ids: Vec<TaxonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<UserLocation>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// One of knn, content, collaborative, hybrid
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Falls back to the engine's default limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RecommendationRequest {
    pub fn new(user_id: impl Into<UserId>, candidates: Vec<Candidate>) -> Self {
        Self {
            user_id: user_id.into(),
            user_groups: Vec::new(),
            user_families: Vec::new(),
            seen_taxon_ids: Vec::new(),
            user_location: None,
            candidates,
            algorithm: default_algorithm(),
            limit: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm.as_str().to_string();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_user_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_families = families.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_seen<I, S>(mut self, seen: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaxonId>,
    {
        self.seen_taxon_ids = seen.into_iter().map(Into::into).collect();
        self
    }
}

/// A recommended species: the candidate as sent, plus its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedSpecies {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Final score rounded to 3 decimals
    pub recommendation_score: f64,
    pub algorithm: Algorithm,
}

impl From<ScoredCandidate> for RecommendedSpecies {
    fn from(scored: ScoredCandidate) -> Self {
        let mut candidate = scored.candidate;
        // Output-only fields never pass through from the input
        candidate.extra.remove("recommendation_score");
        candidate.extra.remove("algorithm");
        Self {
            candidate,
            recommendation_score: round_to(scored.score, 3),
            algorithm: scored.algorithm,
        }
    }
}

/// Response to a single recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub results: Vec<RecommendedSpecies>,
    pub algorithm: Algorithm,
    pub explanation: String,
}

/// Recommendations for many users over one candidate batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub user_ids: Vec<UserId>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Per-user outcome of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Success(RecommendationResponse),
    Failure { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub batch_results: BTreeMap<UserId, BatchOutcome>,
}

/// Main engine that validates requests and dispatches them to strategies
#[derive(Clone)]
pub struct RecommendationEngine {
    interactions: Arc<dyn InteractionStore>,
    feedback: Arc<dyn FeedbackStore>,
    config: EngineConfig,
    knn: Arc<dyn Strategy>,
    content: Arc<dyn Strategy>,
    collaborative: Arc<dyn Strategy>,
    hybrid: Arc<dyn Strategy>,
    filter_pipeline: Arc<FilterPipeline>,
}

impl RecommendationEngine {
    /// Create an engine with the default configuration over one store
    /// implementing both traits
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: InteractionStore + FeedbackStore + 'static,
    {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: InteractionStore + FeedbackStore + 'static,
    {
        Self::from_stores(store.clone(), store, config)
    }

    /// Create an engine over separate interaction and feedback stores
    ///
    /// 1. Create the knn, content and collaborative strategies from the config
    /// 2. Compose them into the hybrid blender with the configured weights
    /// 3. Create the standard filter pipeline
    pub fn from_stores(
        interactions: Arc<dyn InteractionStore>,
        feedback: Arc<dyn FeedbackStore>,
        config: EngineConfig,
    ) -> Self {
        let knn: Arc<dyn Strategy> = Arc::new(
            SimilarityRanker::new(interactions.clone()).with_history_limit(config.history_limit),
        );
        let content: Arc<dyn Strategy> = Arc::new(
            InteractionWeigher::new(interactions.clone())
                .with_history_limit(config.history_limit)
                .with_interaction_weights(config.interaction_weights)
                .with_content_weights(config.content),
        );
        let collaborative: Arc<dyn Strategy> = Arc::new(
            PeerSimilarity::new(interactions.clone())
                .with_history_limit(config.history_limit)
                .with_min_similarity(config.min_peer_similarity)
                .with_concurrency(config.peer_concurrency),
        );
        let hybrid: Arc<dyn Strategy> = Arc::new(
            HybridBlender::default()
                .with_component(knn.clone(), config.hybrid.knn)
                .with_component(content.clone(), config.hybrid.content)
                .with_component(collaborative.clone(), config.hybrid.collaborative),
        );

        Self {
            interactions,
            feedback,
            config,
            knn,
            content,
            collaborative,
            hybrid,
            filter_pipeline: Arc::new(FilterPipeline::standard()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn strategy(&self, algorithm: Algorithm) -> &Arc<dyn Strategy> {
        match algorithm {
            Algorithm::Knn => &self.knn,
            Algorithm::Content => &self.content,
            Algorithm::Collaborative => &self.collaborative,
            Algorithm::Hybrid => &self.hybrid,
        }
    }

    /// Main entry point: recommend species for one request.
    ///
    /// With `request_timeout_ms` set, a request running past the deadline is
    /// dropped (with any in-flight store calls) and reported as a timeout.
    pub async fn recommend(&self, request: RecommendationRequest) -> Result<RecommendationResponse> {
        self.with_deadline(self.run_request(request)).await
    }

    /// Run `work` under the configured request timeout, if any
    async fn with_deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.request_timeout_ms {
            Some(millis) => tokio::time::timeout(Duration::from_millis(millis), work)
                .await
                .map_err(|_| {
                    warn!("Recommendation request timed out after {}ms", millis);
                    RecommendError::Timeout { millis }
                })?,
            None => work.await,
        }
    }

    async fn run_request(&self, request: RecommendationRequest) -> Result<RecommendationResponse> {
        let start_time = Instant::now();

        let algorithm = validate_request(&request)?;
        let limit = request.limit.unwrap_or(self.config.default_limit);
        let context = build_user_context(request, limit);

        let output = self
            .strategy(algorithm)
            .score(&context)
            .await
            .map_err(|e| match e {
                RecommendError::StoreUnavailable(source) if algorithm == Algorithm::Collaborative => {
                    warn!("Collaborative recommendations degraded: {}", source);
                    RecommendError::ServiceDegraded {
                        algorithm,
                        reason: source.to_string(),
                    }
                }
                other => other,
            })?;
        debug!(
            "{} produced {} results: {}",
            algorithm,
            output.results.len(),
            output.explanation
        );

        let mut results = self
            .filter_pipeline
            .apply(output.results, &context)
            .map_err(|e| RecommendError::Internal(format!("{:#}", e)))?;
        results.truncate(limit);

        info!(
            "Recommended {} species for user {} with {} in {:.2?}",
            results.len(),
            context.user_id,
            algorithm,
            start_time.elapsed()
        );

        Ok(RecommendationResponse {
            results: results.into_iter().map(RecommendedSpecies::from).collect(),
            algorithm,
            explanation: output.explanation,
        })
    }

    /// Hybrid recommendations for a user from stored history alone.
    ///
    /// Everything in the history counts as seen; groups and families of
    /// favorited candidates count as explicit preferences. The history read
    /// and the recommendation share one request deadline.
    pub async fn recommend_from_history(
        &self,
        user_id: &str,
        candidates: Vec<Candidate>,
    ) -> Result<RecommendationResponse> {
        self.with_deadline(async {
            let history = self
                .interactions
                .list_interactions(user_id, self.config.history_limit)
                .await?;
            let preferences = ImplicitPreferences::from_history(&history, &candidates);

            let request = RecommendationRequest::new(user_id, candidates)
                .with_seen(preferences.seen_taxon_ids)
                .with_user_groups(preferences.user_groups)
                .with_user_families(preferences.user_families)
                .with_algorithm(Algorithm::Hybrid)
                .with_limit(self.config.batch_limit);
            self.run_request(request).await
        })
        .await
    }

    /// Recommend for many users at once.
    ///
    /// Users are processed a bounded number at a time. A failure for one
    /// user is reported in that user's entry and never aborts the batch.
    pub async fn recommend_batch(&self, request: BatchRequest) -> BatchResponse {
        let start_time = Instant::now();
        let mut unique = HashSet::new();
        let user_ids: Vec<UserId> = request
            .user_ids
            .into_iter()
            .filter(|id| unique.insert(id.clone()))
            .collect();
        let user_count = user_ids.len();
        let candidates = &request.candidates;

        let outcomes: Vec<(UserId, BatchOutcome)> = stream::iter(user_ids)
            .map(|user_id| async move {
                let outcome = match self.recommend_from_history(&user_id, candidates.clone()).await {
                    Ok(response) => BatchOutcome::Success(response),
                    Err(e) => {
                        warn!("Batch recommendation failed for user {}: {}", user_id, e);
                        BatchOutcome::Failure {
                            error: e.to_string(),
                        }
                    }
                };
                (user_id, outcome)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        info!(
            "Batch recommendations for {} users in {:.2?}",
            user_count,
            start_time.elapsed()
        );
        BatchResponse {
            batch_results: outcomes.into_iter().collect(),
        }
    }

    /// Record an interaction. Store failures are returned, never swallowed.
    pub async fn record_interaction(&self, interaction: Interaction) -> Result<()> {
        require_id("user_id", &interaction.user_id)?;
        require_id("taxon_id", &interaction.taxon_id)?;
        self.interactions.record_interaction(interaction).await?;
        Ok(())
    }

    /// Record feedback on a recommendation. Store failures are returned.
    pub async fn record_feedback(&self, feedback: Feedback) -> Result<()> {
        require_id("user_id", &feedback.user_id)?;
        require_id("recommended_taxon_id", &feedback.recommended_taxon_id)?;
        require_id("algorithm_used", &feedback.algorithm_used)?;
        self.feedback.record_feedback(feedback).await?;
        Ok(())
    }

    /// Satisfaction and relevance rates per algorithm
    pub async fn algorithm_performance(&self) -> Result<BTreeMap<String, AlgorithmPerformance>> {
        let feedback = self.feedback.list_feedback().await?;
        Ok(analytics::algorithm_performance(&feedback))
    }

    /// Engagement summary of a user; `None` without history
    pub async fn user_insights(&self, user_id: &str) -> Result<Option<UserInsights>> {
        require_id("user_id", user_id)?;
        let history = self
            .interactions
            .list_interactions(user_id, self.config.history_limit)
            .await?;
        Ok(analytics::user_insights(&history))
    }
}

fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RecommendError::invalid(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Check a request before any scoring and resolve its algorithm
fn validate_request(request: &RecommendationRequest) -> Result<Algorithm> {
    require_id("user_id", &request.user_id)?;
    let algorithm: Algorithm = request.algorithm.parse()?;

    let mut taxon_ids = HashSet::new();
    for (idx, candidate) in request.candidates.iter().enumerate() {
        if candidate.taxon_id.trim().is_empty() {
            return Err(RecommendError::invalid(format!(
                "candidate #{} has an empty taxon_id",
                idx + 1
            )));
        }
        if !taxon_ids.insert(candidate.taxon_id.as_str()) {
            return Err(RecommendError::invalid(format!(
                "duplicate candidate taxon_id {}",
                candidate.taxon_id
            )));
        }
    }
    Ok(algorithm)
}

fn build_user_context(request: RecommendationRequest, limit: usize) -> UserContext {
    UserContext::new(request.user_id, request.candidates, limit)
        .with_user_groups(request.user_groups)
        .with_user_families(request.user_families)
        .with_seen(request.seen_taxon_ids)
        .with_location(request.user_location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use interaction_store::{InMemoryStore, InteractionKind};

    fn create_test_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("1").with_group("Aves").with_family("Fringillidae"),
            Candidate::new("2").with_group("Aves").with_family("Corvidae"),
            Candidate::new("3").with_group("Mammalia").with_family("Felidae"),
        ]
    }

    fn build_test_engine() -> RecommendationEngine {
        RecommendationEngine::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn test_validate_rejects_empty_user() {
        let request = RecommendationRequest::new(" ", create_test_candidates());
        assert!(matches!(
            validate_request(&request),
            Err(RecommendError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_taxon() {
        let mut candidates = create_test_candidates();
        candidates.push(Candidate::new("2"));
        let request = RecommendationRequest::new("u1", candidates);
        assert!(matches!(
            validate_request(&request),
            Err(RecommendError::InvalidRequest(reason)) if reason.contains("duplicate")
        ));
    }

    #[test]
    fn test_validate_rejects_empty_taxon() {
        let request = RecommendationRequest::new("u1", vec![Candidate::new("")]);
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_validate_resolves_algorithm() {
        let mut request = RecommendationRequest::new("u1", create_test_candidates());
        assert_eq!(validate_request(&request).unwrap(), Algorithm::Hybrid);

        request.algorithm = "svd".to_string();
        assert!(matches!(
            validate_request(&request),
            Err(RecommendError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"user_id":"u1","candidates":[{"taxon_id":"1"}]}"#).unwrap();
        assert_eq!(request.algorithm, "hybrid");
        assert_eq!(request.limit, None);
        assert!(request.seen_taxon_ids.is_empty());
    }

    #[test]
    fn test_recommended_species_strips_output_fields() {
        let mut candidate = Candidate::new("1");
        candidate.extra.insert("recommendation_score".into(), serde_json::json!(9.9));
        candidate.extra.insert("common_name".into(), serde_json::json!("Goldfinch"));

        let species =
            RecommendedSpecies::from(ScoredCandidate::new(candidate, 0.12345, Algorithm::Knn));
        assert_eq!(species.recommendation_score, 0.123);

        let json = serde_json::to_value(&species).unwrap();
        assert_eq!(json["recommendation_score"], 0.123);
        assert_eq!(json["common_name"], "Goldfinch");
        assert_eq!(json["algorithm"], "knn");
    }

    #[tokio::test]
    async fn test_knn_explicit_group_example() {
        let engine = build_test_engine();
        let request = RecommendationRequest::new("u1", create_test_candidates())
            .with_user_groups(["Aves"])
            .with_algorithm(Algorithm::Knn)
            .with_limit(2);

        let response = engine.recommend(request).await.unwrap();
        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|r| r.candidate.taxon_id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(response.algorithm, Algorithm::Knn);
    }

    #[tokio::test]
    async fn test_default_limit_applies() {
        let candidates: Vec<Candidate> = (0..15)
            .map(|i| Candidate::new(i.to_string()).with_group("Aves"))
            .collect();
        let engine = build_test_engine();
        let request =
            RecommendationRequest::new("u1", candidates).with_algorithm(Algorithm::Content);

        let response = engine.recommend(request).await.unwrap();
        assert_eq!(response.results.len(), 10);
    }

    #[tokio::test]
    async fn test_record_interaction_validates() {
        let engine = build_test_engine();
        let err = engine
            .record_interaction(Interaction::new("", "1", InteractionKind::View))
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        engine
            .record_interaction(Interaction::new("u1", "1", InteractionKind::View))
            .await
            .unwrap();
        let insights = engine.user_insights("u1").await.unwrap().unwrap();
        assert_eq!(insights.total_interactions, 1);
    }

    #[tokio::test]
    async fn test_user_insights_without_history() {
        let engine = build_test_engine();
        assert!(engine.user_insights("nobody").await.unwrap().is_none());
    }
}
