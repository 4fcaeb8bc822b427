use interaction_store::InMemoryStore;
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    println!("Loading interaction store from {}...\n", data_dir.display());

    let start = Instant::now();
    let store = InMemoryStore::load_from_files(&data_dir)?;
    let elapsed = start.elapsed();

    let (users, interactions, feedback) = store.counts().await;
    let stats = store.stats().await;

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Interactions: {}", interactions);
    println!("Feedback: {}", feedback);
    println!(
        "Average interactions per user: {:.2}",
        stats.average_interactions_per_user
    );
    for (kind, count) in &stats.interaction_types {
        println!("  {:<10} {}", kind, count);
    }
    println!(
        "\nPerformance: {:.0} interactions/second",
        interactions as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
