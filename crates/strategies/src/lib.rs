//! # Strategies Crate
//!
//! This crate implements the recommendation strategies for species.
//!
//! ## Components
//!
//! ### SimilarityRanker ("knn")
//! Nearest neighbours in a one-hot attribute space:
//! - "Species that look like the ones you favorited"
//!
//! ### InteractionWeigher ("content")
//! Group and family affinity weighted by interaction kind, with bonuses for
//! rare species and good photos.
//!
//! ### PeerSimilarity ("collaborative")
//! Jaccard similarity between users' favorites:
//! - "Users who favorited what you favorited also favorited..."
//!
//! ### HybridBlender ("hybrid")
//! Weighted blend of the other three, with a boost for top-ranked species.
//!
//! ## Example Usage
//!
//! ```ignore
//! use strategies::{Candidate, SimilarityRanker, Strategy, UserContext};
//! use interaction_store::InMemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let knn = SimilarityRanker::new(store.clone());
//!
//! let candidates = vec![Candidate::new("1").with_group("Aves")];
//! let context = UserContext::new("user-1", candidates, 10).with_user_groups(["Aves"]);
//!
//! let output = knn.score(&context).await?;
//! println!("{}", output.explanation);
//! ```
//!
//! All strategies are deterministic for a given batch, history and peer
//! state; ties keep the order candidates arrived in.

// Public modules
pub mod collaborative;
pub mod content;
pub mod encoder;
pub mod error;
pub mod hybrid;
pub mod knn;
pub mod traits;
pub mod types;
pub mod user_context;

// Re-export commonly used types
pub use collaborative::{Peer, PeerSimilarity};
pub use content::{ContentWeights, InteractionWeigher, InteractionWeights};
pub use encoder::{FeatureEncoder, cosine_distance};
pub use error::{RecommendError, Result};
pub use hybrid::{BlendComponent, BlendWeight, HybridBlender, HybridWeights};
pub use knn::SimilarityRanker;
pub use traits::Strategy;
pub use types::{Algorithm, Candidate, ScoredCandidate, StrategyOutput, UserLocation};
pub use user_context::{ImplicitPreferences, UserContext};

#[cfg(test)]
mod tests {
    use super::*;
    use interaction_store::{InMemoryStore, Interaction, InteractionKind, InteractionStore};
    use std::sync::Arc;

    fn create_test_store() -> Arc<InMemoryStore> {
        let mut store = InMemoryStore::new();
        store.insert_interaction(Interaction::new("u1", "1", InteractionKind::Favorite));
        store.insert_interaction(Interaction::new("u2", "1", InteractionKind::Favorite));
        store.insert_interaction(Interaction::new("u2", "3", InteractionKind::Favorite));
        Arc::new(store)
    }

    fn create_test_context() -> UserContext {
        let candidates = vec![
            Candidate::new("1").with_group("Aves").with_family("Corvidae"),
            Candidate::new("2").with_group("Aves").with_family("Corvidae"),
            Candidate::new("3").with_group("Mammalia"),
            Candidate::new("4"),
        ];
        UserContext::new("u1", candidates, 2).with_seen(["1"])
    }

    #[tokio::test]
    async fn test_every_strategy_respects_limit_and_seen() {
        let store = create_test_store();
        let interactions: Arc<dyn InteractionStore> = store;
        let knn: Arc<dyn Strategy> = Arc::new(SimilarityRanker::new(interactions.clone()));
        let content: Arc<dyn Strategy> = Arc::new(InteractionWeigher::new(interactions.clone()));
        let collaborative: Arc<dyn Strategy> = Arc::new(PeerSimilarity::new(interactions));
        let weights = HybridWeights::default();
        let hybrid: Arc<dyn Strategy> = Arc::new(
            HybridBlender::default()
                .with_component(knn.clone(), weights.knn)
                .with_component(content.clone(), weights.content)
                .with_component(collaborative.clone(), weights.collaborative),
        );

        let context = create_test_context();
        for strategy in [knn, content, collaborative, hybrid] {
            let output = strategy.score(&context).await.unwrap();
            assert!(output.results.len() <= context.limit);
            for result in &output.results {
                assert_ne!(result.taxon_id(), "1");
                assert!(result.score >= 0.0);
                assert_eq!(result.algorithm, strategy.algorithm());
            }
        }
    }

    #[tokio::test]
    async fn test_empty_batch_never_fails() {
        let store: Arc<dyn InteractionStore> = Arc::new(InMemoryStore::new());
        let context = UserContext::new("nobody", Vec::new(), 10);

        let knn = SimilarityRanker::new(store.clone()).score(&context).await.unwrap();
        let content = InteractionWeigher::new(store.clone()).score(&context).await.unwrap();
        let collaborative = PeerSimilarity::new(store).score(&context).await.unwrap();

        assert!(knn.results.is_empty());
        assert!(content.results.is_empty());
        assert!(collaborative.results.is_empty());
    }
}
