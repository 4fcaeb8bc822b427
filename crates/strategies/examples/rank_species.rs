//! Example: rank a small species batch with every strategy
//!
//! Run with: cargo run --package strategies --example rank_species
//!
//! This example shows how to:
//! 1. Seed an in-memory interaction store
//! 2. Build a user context for one request
//! 3. Run the knn, content, collaborative and hybrid strategies
//! 4. Display the results

use interaction_store::{InMemoryStore, Interaction, InteractionKind, InteractionStore};
use std::sync::Arc;
use std::time::Instant;
use strategies::{
    Candidate, HybridBlender, HybridWeights, InteractionWeigher, PeerSimilarity,
    SimilarityRanker, Strategy, UserContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Natura Species Ranking Example ===\n");

    let mut store = InMemoryStore::new();
    store.insert_interaction(Interaction::new("ana", "101", InteractionKind::Favorite));
    store.insert_interaction(Interaction::new("ana", "205", InteractionKind::Identify));
    store.insert_interaction(Interaction::new("rui", "101", InteractionKind::Favorite));
    store.insert_interaction(Interaction::new("rui", "205", InteractionKind::Favorite));
    store.insert_interaction(Interaction::new("rui", "310", InteractionKind::Favorite));
    let store: Arc<dyn InteractionStore> = Arc::new(store);

    let candidates = vec![
        Candidate::new("101").with_group("Aves").with_family("Turdidae"),
        Candidate::new("102")
            .with_group("Aves")
            .with_family("Turdidae")
            .with_habitat("forest"),
        Candidate::new("205").with_group("Aves").with_family("Corvidae"),
        Candidate::new("310")
            .with_group("Mammalia")
            .with_family("Mustelidae")
            .with_rarity_score(0.9),
        Candidate::new("411")
            .with_group("Insecta")
            .with_family("Apidae")
            .with_image_quality(0.95),
    ];
    let context = UserContext::new("ana", candidates, 3).with_seen(["101", "205"]);

    let knn: Arc<dyn Strategy> = Arc::new(SimilarityRanker::new(store.clone()));
    let content: Arc<dyn Strategy> = Arc::new(InteractionWeigher::new(store.clone()));
    let collaborative: Arc<dyn Strategy> = Arc::new(PeerSimilarity::new(store.clone()));
    let weights = HybridWeights::default();
    let hybrid: Arc<dyn Strategy> = Arc::new(
        HybridBlender::default()
            .with_component(knn.clone(), weights.knn)
            .with_component(content.clone(), weights.content)
            .with_component(collaborative.clone(), weights.collaborative),
    );

    for strategy in [knn, content, collaborative, hybrid] {
        let start = Instant::now();
        let output = strategy.score(&context).await?;
        println!(
            "{} ({:?}): {}",
            strategy.algorithm(),
            start.elapsed(),
            output.explanation
        );
        for (i, result) in output.results.iter().enumerate() {
            println!(
                "  {}. {} {} (Score: {:.3})",
                i + 1,
                result.taxon_id(),
                result.candidate.group().unwrap_or("-"),
                result.score
            );
        }
        println!();
    }

    Ok(())
}
