use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use engine::{
    BatchOutcome, BatchRequest, EngineConfig, RecommendationEngine, RecommendationRequest,
    RecommendationResponse,
};
use interaction_store::{
    Feedback, FeedbackKind, InMemoryStore, Interaction, InteractionKind, UserId,
    parse_records,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strategies::{Algorithm, Candidate};
use tracing::info;

/// NaturaRecs - Species Recommendation Engine
#[derive(Parser)]
#[command(name = "natura-recs")]
#[command(about = "Species recommendations from knn, content, collaborative and hybrid strategies", long_about = None)]
struct Cli {
    /// Directory holding interactions.jsonl and feedback.jsonl
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Optional JSON engine config
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend species for one user from a candidate file
    Recommend {
        #[arg(long)]
        user_id: UserId,

        /// JSON array or JSON-lines file of candidate species
        #[arg(long)]
        candidates: PathBuf,

        /// knn, content, collaborative or hybrid
        #[arg(long, default_value = "hybrid")]
        algorithm: String,

        #[arg(long)]
        limit: Option<usize>,

        /// Preferred taxonomic group (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Preferred family (repeatable)
        #[arg(long = "family")]
        families: Vec<String>,

        /// Taxon already seen by the user (repeatable)
        #[arg(long = "seen")]
        seen: Vec<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Recommend for several users, deriving preferences from their history
    Batch {
        /// User to recommend for (repeatable)
        #[arg(long = "user-id", required = true)]
        user_ids: Vec<UserId>,

        #[arg(long)]
        candidates: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Record a user interaction and save the store
    Record {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        taxon_id: String,

        /// view, favorite, identify or search
        #[arg(long = "type")]
        kind: String,

        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Record feedback on a recommendation and save the store
    Feedback {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        taxon_id: String,

        /// liked, disliked, not_relevant or already_known
        #[arg(long = "type")]
        kind: String,

        #[arg(long)]
        algorithm: String,
    },

    /// Show satisfaction and relevance per algorithm
    Performance,

    /// Show engagement insights for one user
    Insights {
        #[arg(long)]
        user_id: UserId,
    },

    /// Show aggregate interaction statistics
    Stats,

    /// Run benchmark to test performance
    Benchmark {
        #[arg(long)]
        candidates: PathBuf,

        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        #[arg(long, default_value = "hybrid")]
        algorithm: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let start = Instant::now();
    let store = Arc::new(
        InMemoryStore::load_from_files(&cli.data_dir)
            .with_context(|| format!("Failed to load store from {}", cli.data_dir.display()))?,
    );
    let (users, interactions, feedback) = store.counts().await;
    info!(
        "Loaded {} interactions from {} users and {} feedback records in {:?}",
        interactions,
        users,
        feedback,
        start.elapsed()
    );

    let engine = RecommendationEngine::with_config(store.clone(), config);

    match cli.command {
        Commands::Recommend {
            user_id,
            candidates,
            algorithm,
            limit,
            groups,
            families,
            seen,
            json,
        } => {
            let mut request = RecommendationRequest::new(user_id, load_candidates(&candidates)?)
                .with_user_groups(groups)
                .with_user_families(families)
                .with_seen(seen);
            request.algorithm = algorithm;
            request.limit = limit;
            handle_recommend(&engine, request, json).await?
        }
        Commands::Batch {
            user_ids,
            candidates,
            json,
        } => handle_batch(&engine, user_ids, load_candidates(&candidates)?, json).await?,
        Commands::Record {
            user_id,
            taxon_id,
            kind,
            confidence,
        } => {
            let kind: InteractionKind = kind.parse()?;
            let mut interaction = Interaction::new(user_id, taxon_id, kind);
            interaction.confidence = confidence;
            engine.record_interaction(interaction).await?;
            save(&store, &cli.data_dir).await?;
            println!("{} Interaction recorded", "✓".green());
        }
        Commands::Feedback {
            user_id,
            taxon_id,
            kind,
            algorithm,
        } => {
            let kind: FeedbackKind = kind.parse()?;
            engine
                .record_feedback(Feedback::new(user_id, taxon_id, kind, algorithm))
                .await?;
            save(&store, &cli.data_dir).await?;
            println!("{} Feedback recorded", "✓".green());
        }
        Commands::Performance => handle_performance(&engine).await?,
        Commands::Insights { user_id } => handle_insights(&engine, &user_id).await?,
        Commands::Stats => handle_stats(&store).await,
        Commands::Benchmark {
            candidates,
            requests,
            algorithm,
        } => {
            handle_benchmark(&engine, &store, load_candidates(&candidates)?, requests, algorithm)
                .await?
        }
    }

    Ok(())
}

fn load_candidates(path: &Path) -> Result<Vec<Candidate>> {
    parse_records(path).with_context(|| format!("Failed to read candidates from {}", path.display()))
}

async fn save(store: &InMemoryStore, data_dir: &Path) -> Result<()> {
    store
        .save_to_files(data_dir)
        .await
        .with_context(|| format!("Failed to save store to {}", data_dir.display()))
}

/// Handle the 'recommend' command
async fn handle_recommend(
    engine: &RecommendationEngine,
    request: RecommendationRequest,
    json: bool,
) -> Result<()> {
    let response = engine.recommend(request).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_recommendations(&response);
    }
    Ok(())
}

/// Handle the 'batch' command
async fn handle_batch(
    engine: &RecommendationEngine,
    user_ids: Vec<UserId>,
    candidates: Vec<Candidate>,
    json: bool,
) -> Result<()> {
    let response = engine
        .recommend_batch(BatchRequest {
            user_ids,
            candidates,
        })
        .await;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    for (user_id, outcome) in &response.batch_results {
        println!("{}", format!("User {}", user_id).bold().blue());
        match outcome {
            BatchOutcome::Success(recommendations) => print_recommendations(recommendations),
            BatchOutcome::Failure { error } => println!("  {} {}", "✗".red(), error),
        }
    }
    Ok(())
}

/// Handle the 'performance' command
async fn handle_performance(engine: &RecommendationEngine) -> Result<()> {
    let performance = engine.algorithm_performance().await?;
    println!("{}", "Algorithm performance:".bold().blue());
    if performance.is_empty() {
        println!("  No feedback recorded yet");
    }
    for (algorithm, stats) in &performance {
        println!(
            "{} {}: {} feedback, satisfaction {:.3}, relevance {:.3}",
            "•".green(),
            algorithm.bold(),
            stats.total_feedback,
            stats.satisfaction_rate,
            stats.relevance_rate
        );
        for (kind, count) in &stats.feedback_breakdown {
            println!("    {}: {}", kind, count);
        }
    }
    Ok(())
}

/// Handle the 'insights' command
async fn handle_insights(engine: &RecommendationEngine, user_id: &str) -> Result<()> {
    let Some(insights) = engine.user_insights(user_id).await? else {
        println!("User {} has no recorded interactions", user_id);
        return Ok(());
    };

    println!("{}", format!("User ID: {}", user_id).bold().blue());
    println!("{}Total interactions: {}", "• ".green(), insights.total_interactions);
    println!("{}Engagement score: {:.3}", "• ".green(), insights.engagement_score);
    println!("Interaction breakdown:");
    for (kind, count) in &insights.interaction_breakdown {
        println!("  - {}: {}", kind, count);
    }
    Ok(())
}

/// Handle the 'stats' command
async fn handle_stats(store: &InMemoryStore) {
    let stats = store.stats().await;
    println!("{}", "Interaction statistics:".bold().blue());
    println!("{}Total interactions: {}", "• ".green(), stats.total_interactions);
    println!("{}Unique users: {}", "• ".green(), stats.unique_users);
    println!(
        "{}Average interactions per user: {:.2}",
        "• ".green(),
        stats.average_interactions_per_user
    );
    println!("Interaction types:");
    for (kind, count) in &stats.interaction_types {
        println!("  - {}: {}", kind, count);
    }
    println!("Top species:");
    for species in &stats.top_species {
        println!("  - {} ({} interactions)", species.taxon_id, species.interactions);
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    engine: &RecommendationEngine,
    store: &InMemoryStore,
    candidates: Vec<Candidate>,
    requests: usize,
    algorithm: String,
) -> Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    if requests == 0 {
        bail!("Benchmark needs at least one request");
    }

    let users = store.user_ids().await;
    if users.is_empty() {
        bail!("No users with recorded interactions in the store");
    }

    let user_ids: Vec<UserId> = (0..requests)
        .map(|_| users[rand::random_range(0..users.len())].clone())
        .collect();

    let started = Instant::now();
    let mut handles = vec![];
    for user in user_ids {
        let engine = engine.clone();
        let request = RecommendationRequest::new(user, candidates.clone()).with_algorithm(algorithm);
        handles.push(tokio::spawn(async move {
            let start = Instant::now();
            engine.recommend(request).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = started.elapsed();

    timings.sort();
    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() as f64 * 0.95) as usize];
    let p99 = timings[(timings.len() as f64 * 0.99) as usize];
    let throughput = requests as f64 / wall_time.as_secs_f64();

    println!("{}", format!("Benchmark results ({}):", algorithm).bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

fn print_recommendations(response: &RecommendationResponse) {
    println!(
        "{} {}",
        format!("Species recommendations ({}):", response.algorithm).bold().blue(),
        response.explanation.dimmed()
    );
    if response.results.is_empty() {
        println!("  No recommendations");
    }
    for (index, species) in response.results.iter().enumerate() {
        let candidate = &species.candidate;
        println!(
            "{}. {} [{} / {}] - Score: {:.3}",
            (index + 1).to_string().green(),
            candidate.taxon_id,
            candidate.group().unwrap_or("-"),
            candidate.family().unwrap_or("-"),
            species.recommendation_score
        );
    }
}
