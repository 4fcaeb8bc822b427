//! PeerSimilarity - collaborative filtering ("collaborative")
//!
//! "Users who favorited what you favorited also favorited these species"
//!
//! ## Algorithm
//! 1. Collect the user's strong-signal species (favorite or identify)
//! 2. Fetch every other user's history, a bounded number at a time
//! 3. Keep peers whose Jaccard similarity with the user exceeds 0.1
//! 4. Every strong interaction of a kept peer adds the peer's similarity to
//!    that species, unless the user already has it or has seen it
//! 5. Rank the request candidates by accumulated score

use crate::error::Result;
use crate::traits::Strategy;
use crate::types::{Algorithm, ScoredCandidate, StrategyOutput, sort_by_score_desc};
use crate::user_context::{DEFAULT_HISTORY_LIMIT, UserContext};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use interaction_store::{Interaction, InteractionStore, TaxonId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of peer histories fetched concurrently
pub const DEFAULT_PEER_CONCURRENCY: usize = 16;

/// Default similarity a peer must exceed to be kept
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.1;

/// Another user similar enough to borrow recommendations from
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub user_id: UserId,
    /// Jaccard similarity with the requesting user
    pub similarity: f64,
    /// Taxon ids of the peer's strong interactions, one per interaction
    pub strong_interactions: Vec<TaxonId>,
}

/// Species a history marks as strong preferences
pub fn strong_taxa(history: &[Interaction]) -> HashSet<TaxonId> {
    history
        .iter()
        .filter(|i| i.kind.is_strong_signal())
        .map(|i| i.taxon_id.clone())
        .collect()
}

/// `|a ∩ b| / |a ∪ b|`, or 0 when either set is empty
pub fn jaccard(a: &HashSet<TaxonId>, b: &HashSet<TaxonId>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Collaborative strategy over peer similarity
pub struct PeerSimilarity {
    store: Arc<dyn InteractionStore>,
    history_limit: usize,
    min_similarity: f64,
    concurrency: usize,
}

impl PeerSimilarity {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self {
            store,
            history_limit: DEFAULT_HISTORY_LIMIT,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            concurrency: DEFAULT_PEER_CONCURRENCY,
        }
    }

    /// Configure how many history entries are read per user (default: 100)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Configure the similarity a peer must exceed (default: 0.1)
    pub fn with_min_similarity(mut self, min: f64) -> Self {
        self.min_similarity = min;
        self
    }

    /// Configure how many peer histories are fetched at once (default: 16)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build a peer from its history, or `None` when it is not similar enough
    pub fn evaluate_peer(
        &self,
        own: &HashSet<TaxonId>,
        user_id: UserId,
        history: &[Interaction],
    ) -> Option<Peer> {
        let theirs = strong_taxa(history);
        let similarity = jaccard(own, &theirs);
        if similarity <= self.min_similarity {
            return None;
        }

        Some(Peer {
            user_id,
            similarity,
            strong_interactions: history
                .iter()
                .filter(|i| i.kind.is_strong_signal())
                .map(|i| i.taxon_id.clone())
                .collect(),
        })
    }

    /// Fetch every other user's history and keep the similar ones, ordered
    /// by user id.
    async fn find_peers(&self, user_id: &str, own: &HashSet<TaxonId>) -> Result<Vec<Peer>> {
        let others = self.store.list_other_user_ids(user_id).await?;
        debug!("Comparing against {} other users", others.len());

        let mut histories: Vec<(UserId, Vec<Interaction>)> = stream::iter(others)
            .map(|peer_id| {
                let store = Arc::clone(&self.store);
                let limit = self.history_limit;
                async move {
                    let result = store.list_interactions(&peer_id, limit).await;
                    (peer_id, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|(peer_id, result)| async move {
                match result {
                    Ok(history) => Some((peer_id, history)),
                    Err(e) => {
                        warn!("Skipping peer {}: {}", peer_id, e);
                        None
                    }
                }
            })
            .collect()
            .await;

        // Completion order is arbitrary; sort so score sums are reproducible
        histories.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(histories
            .into_iter()
            .filter_map(|(peer_id, history)| self.evaluate_peer(own, peer_id, &history))
            .collect())
    }

    /// Rank the context's candidates from already evaluated peers.
    pub fn rank(
        &self,
        context: &UserContext,
        own: &HashSet<TaxonId>,
        peers: &[Peer],
    ) -> StrategyOutput {
        let mut scores: HashMap<&str, f64> = HashMap::new();
        for peer in peers {
            for taxon_id in &peer.strong_interactions {
                if own.contains(taxon_id) || context.is_seen(taxon_id) {
                    continue;
                }
                *scores.entry(taxon_id.as_str()).or_insert(0.0) += peer.similarity;
            }
        }

        let mut results: Vec<ScoredCandidate> = context
            .candidates
            .iter()
            .filter_map(|c| {
                scores
                    .get(c.taxon_id.as_str())
                    .map(|&score| ScoredCandidate::new(c.clone(), score, Algorithm::Collaborative))
            })
            .collect();

        sort_by_score_desc(&mut results);
        results.truncate(context.limit);

        StrategyOutput::new(
            results,
            format!("Based on {} similar users", peers.len()),
        )
    }
}

#[async_trait]
impl Strategy for PeerSimilarity {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Collaborative
    }

    #[instrument(skip(self, context), fields(user_id = %context.user_id))]
    async fn score(&self, context: &UserContext) -> Result<StrategyOutput> {
        let history = self
            .store
            .list_interactions(&context.user_id, self.history_limit)
            .await?;
        let own = strong_taxa(&history);
        if own.is_empty() {
            debug!("No strong interactions, skipping peer search");
            return Ok(StrategyOutput::empty("Based on 0 similar users"));
        }

        let peers = self.find_peers(&context.user_id, &own).await?;
        debug!("Found {} similar users", peers.len());
        Ok(self.rank(context, &own, &peers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candidate;
    use interaction_store::{InMemoryStore, InteractionKind};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn set(ids: &[&str]) -> HashSet<TaxonId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();

        // Target user favors 1, 2, 3
        for taxon in ["1", "2", "3"] {
            store.insert_interaction(Interaction::new("u1", taxon, InteractionKind::Favorite));
        }

        // Similar user: shares 1, 2, 3 and also likes 4, 5 (J = 3/5)
        for taxon in ["1", "2", "3", "4", "5"] {
            store.insert_interaction(Interaction::new("u2", taxon, InteractionKind::Identify));
        }

        // Barely similar user: shares only 1 among 10 (J = 1/12)
        store.insert_interaction(Interaction::new("u3", "1", InteractionKind::Favorite));
        for taxon in 6..=14 {
            store.insert_interaction(Interaction::new(
                "u3",
                taxon.to_string(),
                InteractionKind::Favorite,
            ));
        }

        // Weak-signal user: views only
        store.insert_interaction(Interaction::new("u4", "4", InteractionKind::View));

        store
    }

    fn create_test_candidates() -> Vec<Candidate> {
        (1..=6).map(|i| Candidate::new(i.to_string())).collect()
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&set(&["1", "2"]), &set(&["2", "3"])), 1.0 / 3.0);
        assert_eq!(jaccard(&set(&["1"]), &set(&["1"])), 1.0);
        assert_eq!(jaccard(&set(&[]), &set(&["1"])), 0.0);
    }

    #[test]
    fn test_evaluate_peer_threshold() {
        let peers = PeerSimilarity::new(Arc::new(InMemoryStore::new()));
        let own = set(&["1", "2", "3"]);

        let history = vec![Interaction::new("u9", "9", InteractionKind::Favorite)];
        assert!(peers.evaluate_peer(&own, "u9".into(), &history).is_none());

        let history = vec![
            Interaction::new("u9", "1", InteractionKind::Favorite),
            Interaction::new("u9", "9", InteractionKind::View),
        ];
        let peer = peers.evaluate_peer(&own, "u9".into(), &history).unwrap();
        assert!((peer.similarity - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(peer.strong_interactions, vec!["1"]);
    }

    #[test]
    fn test_each_peer_contributes_its_similarity() {
        let strategy = PeerSimilarity::new(Arc::new(InMemoryStore::new()));
        let context = UserContext::new("u1", create_test_candidates(), 10).with_seen(["5"]);
        let own = set(&["1"]);
        let peers = vec![
            Peer {
                user_id: "a".into(),
                similarity: 0.5,
                strong_interactions: vec!["1".into(), "4".into(), "5".into()],
            },
            Peer {
                user_id: "b".into(),
                similarity: 0.25,
                strong_interactions: vec!["4".into(), "6".into()],
            },
        ];

        let output = strategy.rank(&context, &own, &peers);
        let ranked: Vec<(&str, f64)> = output
            .results
            .iter()
            .map(|r| (r.taxon_id(), r.score))
            .collect();
        assert_eq!(ranked, vec![("4", 0.75), ("6", 0.25)]);
        assert_eq!(output.explanation, "Based on 2 similar users");
    }

    #[tokio::test]
    async fn test_score_finds_similar_users() {
        let strategy = PeerSimilarity::new(Arc::new(create_test_store()));
        let context = UserContext::new("u1", create_test_candidates(), 10);

        let output = strategy.score(&context).await.unwrap();
        let ids: Vec<&str> = output.results.iter().map(|r| r.taxon_id()).collect();

        // Only u2 is similar enough; 4 and 5 tie and keep candidate order
        assert_eq!(ids, vec!["4", "5"]);
        assert!((output.results[0].score - 0.6).abs() < 1e-12);
        assert_eq!(output.explanation, "Based on 1 similar users");
    }

    #[tokio::test]
    async fn test_user_without_strong_signal_gets_nothing() {
        let strategy = PeerSimilarity::new(Arc::new(create_test_store()));
        let context = UserContext::new("u4", create_test_candidates(), 10);

        let output = strategy.score(&context).await.unwrap();
        assert!(output.results.is_empty());
    }

    /// Store with many peers that records how many reads run at once
    #[derive(Default)]
    struct CountingStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl InteractionStore for CountingStore {
        async fn record_interaction(
            &self,
            _interaction: Interaction,
        ) -> interaction_store::Result<()> {
            Ok(())
        }

        async fn list_interactions(
            &self,
            user_id: &str,
            _limit: usize,
        ) -> interaction_store::Result<Vec<Interaction>> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(vec![
                Interaction::new(user_id, "1", InteractionKind::Favorite),
                Interaction::new(user_id, "2", InteractionKind::Favorite),
            ])
        }

        async fn list_other_user_ids(
            &self,
            user_id: &str,
        ) -> interaction_store::Result<BTreeSet<UserId>> {
            Ok((0..100)
                .map(|i| format!("peer-{:03}", i))
                .filter(|id| id != user_id)
                .collect())
        }
    }

    #[tokio::test]
    async fn test_peer_fetches_are_bounded() {
        let store = Arc::new(CountingStore::default());
        let strategy = PeerSimilarity::new(store.clone()).with_concurrency(4);
        let context = UserContext::new("u1", create_test_candidates(), 10);

        let output = strategy.score(&context).await.unwrap();
        assert_eq!(output.explanation, "Based on 100 similar users");

        let peak = store.peak.load(Ordering::SeqCst);
        assert!((1..=4).contains(&peak), "peak concurrency {}", peak);
    }

    #[tokio::test]
    async fn test_results_are_deterministic() {
        let strategy =
            PeerSimilarity::new(Arc::new(create_test_store())).with_concurrency(2);
        let context = UserContext::new("u1", create_test_candidates(), 10);

        let first = strategy.score(&context).await.unwrap();
        let second = strategy.score(&context).await.unwrap();
        assert_eq!(first, second);
    }
}
