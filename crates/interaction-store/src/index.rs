//! In-memory implementation of the store traits.
//!
//! [`InMemoryStore`] keeps every interaction grouped by user and every
//! feedback record in insertion order. It backs the unit tests, the CLI
//! (loaded from and saved to a data directory of JSON-lines files) and any
//! deployment small enough not to need a database.

use crate::error::{Result, StoreError};
use crate::parser;
use crate::store::{FeedbackStore, InteractionStore};
use crate::types::*;
use async_trait::async_trait;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// File holding one interaction per line inside a data directory
pub const INTERACTIONS_FILE: &str = "interactions.jsonl";

/// File holding one feedback record per line inside a data directory
pub const FEEDBACK_FILE: &str = "feedback.jsonl";

/// How many species [`InMemoryStore::stats`] reports as most popular
const TOP_SPECIES: usize = 10;

#[derive(Debug, Default)]
struct StoreState {
    /// All interactions made by each user, in insertion order
    interactions: HashMap<UserId, Vec<Interaction>>,
    feedback: Vec<Feedback>,
}

/// Interaction and feedback store held entirely in memory.
///
/// Reads take a shared lock for the duration of one call only, so concurrent
/// recommendation requests never block each other.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Creates a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an interaction while building a fixture or loading a file.
    ///
    /// Unlike [`InteractionStore::record_interaction`] this keeps a missing
    /// timestamp as-is.
    pub fn insert_interaction(&mut self, interaction: Interaction) {
        self.state
            .get_mut()
            .interactions
            .entry(interaction.user_id.clone())
            .or_default()
            .push(interaction);
    }

    /// Insert a feedback record while building a fixture or loading a file.
    pub fn insert_feedback(&mut self, feedback: Feedback) {
        self.state.get_mut().feedback.push(feedback);
    }

    /// Load a store from a data directory.
    ///
    /// Steps:
    /// 1. Parse interactions.jsonl and feedback.jsonl in parallel
    /// 2. Validate every record
    /// 3. Insert into a fresh store
    ///
    /// A missing file loads as empty so a new data directory is usable
    /// straight away.
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        let interactions_path = data_dir.join(INTERACTIONS_FILE);
        let feedback_path = data_dir.join(FEEDBACK_FILE);

        let (interactions, feedback) = rayon::join(
            || load_optional::<Interaction>(&interactions_path),
            || load_optional::<Feedback>(&feedback_path),
        );
        let interactions = interactions?;
        let feedback = feedback?;

        validate_interactions(&interactions)?;
        validate_feedback(&feedback)?;

        info!(
            "Loaded {} interactions and {} feedback records from {}",
            interactions.len(),
            feedback.len(),
            data_dir.display()
        );

        let mut store = InMemoryStore::new();
        for interaction in interactions {
            store.insert_interaction(interaction);
        }
        for record in feedback {
            store.insert_feedback(record);
        }
        Ok(store)
    }

    /// Write the whole store back to a data directory.
    ///
    /// Interactions are written grouped by user (users in id order), each
    /// user's records in insertion order, so a save/load cycle preserves
    /// recency ordering.
    pub async fn save_to_files(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let state = self.state.read().await;

        let users: BTreeMap<&UserId, &Vec<Interaction>> = state.interactions.iter().collect();
        let interactions: Vec<&Interaction> = users.into_values().flatten().collect();

        parser::write_json_lines(&data_dir.join(INTERACTIONS_FILE), &interactions)?;
        parser::write_json_lines(&data_dir.join(FEEDBACK_FILE), &state.feedback)?;
        debug!(
            "Saved {} interactions and {} feedback records to {}",
            interactions.len(),
            state.feedback.len(),
            data_dir.display()
        );
        Ok(())
    }

    /// Get counts for debugging/validation: (users, interactions, feedback)
    pub async fn counts(&self) -> (usize, usize, usize) {
        let state = self.state.read().await;
        let total_interactions = state.interactions.values().map(|v| v.len()).sum();
        (
            state.interactions.len(),
            total_interactions,
            state.feedback.len(),
        )
    }

    /// Every user with at least one interaction, in id order
    pub async fn user_ids(&self) -> Vec<UserId> {
        let state = self.state.read().await;
        let ids: BTreeSet<&UserId> = state
            .interactions
            .iter()
            .filter(|(_, interactions)| !interactions.is_empty())
            .map(|(id, _)| id)
            .collect();
        ids.into_iter().cloned().collect()
    }

    /// Aggregate statistics over every stored interaction.
    ///
    /// Per-user counts are computed in parallel and merged; the top species
    /// list is ordered by count, then by taxon id.
    pub async fn stats(&self) -> InteractionStats {
        let state = self.state.read().await;

        let (interaction_types, popularity) = state
            .interactions
            .par_iter()
            .fold(
                || (BTreeMap::new(), HashMap::new()),
                |(mut kinds, mut species), (_user_id, interactions)| {
                    for interaction in interactions {
                        *kinds.entry(interaction.kind).or_insert(0) += 1;
                        *species.entry(interaction.taxon_id.as_str()).or_insert(0) += 1;
                    }
                    (kinds, species)
                },
            )
            .reduce(
                || (BTreeMap::new(), HashMap::new()),
                |(mut kinds, mut species), (local_kinds, local_species)| {
                    for (kind, count) in local_kinds {
                        *kinds.entry(kind).or_insert(0) += count;
                    }
                    for (taxon_id, count) in local_species {
                        *species.entry(taxon_id).or_insert(0) += count;
                    }
                    (kinds, species)
                },
            );

        let total_interactions: usize = interaction_types.values().sum();
        let unique_users = state
            .interactions
            .values()
            .filter(|interactions| !interactions.is_empty())
            .count();

        let mut top_species: Vec<SpeciesPopularity> = popularity
            .into_iter()
            .map(|(taxon_id, interactions)| SpeciesPopularity {
                taxon_id: taxon_id.to_string(),
                interactions,
            })
            .collect();
        top_species.sort_by(|a, b| {
            b.interactions
                .cmp(&a.interactions)
                .then_with(|| a.taxon_id.cmp(&b.taxon_id))
        });
        top_species.truncate(TOP_SPECIES);

        InteractionStats {
            total_interactions,
            unique_users,
            interaction_types,
            top_species,
            average_interactions_per_user: total_interactions as f64 / unique_users.max(1) as f64,
        }
    }
}

#[async_trait]
impl InteractionStore for InMemoryStore {
    async fn record_interaction(&self, mut interaction: Interaction) -> Result<()> {
        validate_interaction(&interaction)?;
        if interaction.timestamp.is_none() {
            interaction.timestamp = Some(Utc::now());
        }

        let mut state = self.state.write().await;
        state
            .interactions
            .entry(interaction.user_id.clone())
            .or_default()
            .push(interaction);
        Ok(())
    }

    async fn list_interactions(&self, user_id: &str, limit: usize) -> Result<Vec<Interaction>> {
        let state = self.state.read().await;
        let Some(interactions) = state.interactions.get(user_id) else {
            return Ok(Vec::new());
        };

        // Newest insert first, then a stable sort on timestamp keeps insert
        // order as the tie-break. Undated records sort last.
        let mut history: Vec<Interaction> = interactions.iter().rev().cloned().collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history.truncate(limit);
        Ok(history)
    }

    async fn list_other_user_ids(&self, user_id: &str) -> Result<BTreeSet<UserId>> {
        let state = self.state.read().await;
        Ok(state
            .interactions
            .iter()
            .filter(|(id, interactions)| id.as_str() != user_id && !interactions.is_empty())
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[async_trait]
impl FeedbackStore for InMemoryStore {
    async fn record_feedback(&self, feedback: Feedback) -> Result<()> {
        validate_feedback_record(&feedback)?;
        self.state.write().await.feedback.push(feedback);
        Ok(())
    }

    async fn list_feedback(&self) -> Result<Vec<Feedback>> {
        Ok(self.state.read().await.feedback.clone())
    }
}

/// Parse a data file, treating a missing file as empty
fn load_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("{} not found, starting empty", path.display());
        return Ok(Vec::new());
    }
    parser::parse_json_lines(path)
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_interaction(interaction: &Interaction) -> Result<()> {
    require_non_empty("user_id", &interaction.user_id)?;
    require_non_empty("taxon_id", &interaction.taxon_id)?;
    match interaction.confidence {
        Some(confidence) if !confidence.is_finite() => Err(StoreError::InvalidValue {
            field: "confidence".to_string(),
            value: confidence.to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_feedback_record(feedback: &Feedback) -> Result<()> {
    require_non_empty("user_id", &feedback.user_id)?;
    require_non_empty("recommended_taxon_id", &feedback.recommended_taxon_id)?;
    require_non_empty("algorithm_used", &feedback.algorithm_used)
}

/// Validate loaded interactions, reporting the first offending record
fn validate_interactions(interactions: &[Interaction]) -> Result<()> {
    for (idx, interaction) in interactions.iter().enumerate() {
        validate_interaction(interaction).map_err(|e| {
            StoreError::ValidationError(format!("interaction #{}: {}", idx + 1, e))
        })?;
    }
    Ok(())
}

fn validate_feedback(feedback: &[Feedback]) -> Result<()> {
    for (idx, record) in feedback.iter().enumerate() {
        validate_feedback_record(record)
            .map_err(|e| StoreError::ValidationError(format!("feedback #{}: {}", idx + 1, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn create_test_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.insert_interaction(
            Interaction::new("1", "10", InteractionKind::View).with_timestamp(at(100)),
        );
        store.insert_interaction(
            Interaction::new("1", "11", InteractionKind::Favorite).with_timestamp(at(300)),
        );
        store.insert_interaction(
            Interaction::new("1", "12", InteractionKind::Identify).with_timestamp(at(200)),
        );
        store.insert_interaction(
            Interaction::new("2", "11", InteractionKind::Favorite).with_timestamp(at(150)),
        );
        store.insert_interaction(
            Interaction::new("3", "10", InteractionKind::Search).with_timestamp(at(120)),
        );
        store
    }

    #[tokio::test]
    async fn test_list_interactions_newest_first() {
        let store = create_test_store();
        let history = store.list_interactions("1", 100).await.unwrap();

        let taxa: Vec<&str> = history.iter().map(|i| i.taxon_id.as_str()).collect();
        assert_eq!(taxa, vec!["11", "12", "10"]);
    }

    #[tokio::test]
    async fn test_list_interactions_respects_limit() {
        let store = create_test_store();
        let history = store.list_interactions("1", 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].taxon_id, "11");
    }

    #[tokio::test]
    async fn test_unknown_user_has_empty_history() {
        let store = create_test_store();
        assert!(store.list_interactions("999", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_other_user_ids_excludes_requester() {
        let store = create_test_store();
        let others = store.list_other_user_ids("1").await.unwrap();
        let others: Vec<&str> = others.iter().map(|s| s.as_str()).collect();
        assert_eq!(others, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_record_interaction_stamps_time() {
        let store = InMemoryStore::new();
        store
            .record_interaction(Interaction::new("7", "70", InteractionKind::Identify))
            .await
            .unwrap();

        let history = store.list_interactions("7", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn test_record_interaction_rejects_empty_taxon() {
        let store = InMemoryStore::new();
        let err = store
            .record_interaction(Interaction::new("7", " ", InteractionKind::View))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
        assert_eq!(store.counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = create_test_store();
        let stats = store.stats().await;

        assert_eq!(stats.total_interactions, 5);
        assert_eq!(stats.unique_users, 3);
        assert_eq!(stats.interaction_types[&InteractionKind::Favorite], 2);
        assert_eq!(stats.top_species[0].taxon_id, "10");
        assert_eq!(stats.top_species[0].interactions, 2);
        assert_eq!(stats.top_species[1].taxon_id, "11");
        assert!((stats.average_interactions_per_user - 5.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stats_empty_store() {
        let stats = InMemoryStore::new().stats().await;
        assert_eq!(stats.total_interactions, 0);
        assert_eq!(stats.average_interactions_per_user, 0.0);
        assert!(stats.top_species.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store();
        store
            .record_feedback(Feedback::new("1", "12", FeedbackKind::Liked, "knn"))
            .await
            .unwrap();
        store.save_to_files(dir.path()).await.unwrap();

        let loaded = InMemoryStore::load_from_files(dir.path()).unwrap();
        assert_eq!(loaded.counts().await, (3, 5, 1));

        let history = loaded.list_interactions("1", 100).await.unwrap();
        let taxa: Vec<&str> = history.iter().map(|i| i.taxon_id.as_str()).collect();
        assert_eq!(taxa, vec!["11", "12", "10"]);
    }

    #[tokio::test]
    async fn test_save_keeps_unrecognized_interaction_types() {
        let dir = tempfile::tempdir().unwrap();
        let stored = "{\"user_id\":\"1\",\"taxon_id\":\"10\",\"type\":\"share\"}";
        std::fs::write(dir.path().join(INTERACTIONS_FILE), format!("{}\n", stored)).unwrap();

        let store = InMemoryStore::load_from_files(dir.path()).unwrap();
        let history = store.list_interactions("1", 10).await.unwrap();
        assert_eq!(history[0].kind, InteractionKind::Unknown);

        store
            .record_interaction(Interaction::new("2", "11", InteractionKind::View))
            .await
            .unwrap();
        store.save_to_files(dir.path()).await.unwrap();

        let saved = std::fs::read_to_string(dir.path().join(INTERACTIONS_FILE)).unwrap();
        let lines: Vec<&str> = saved.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], stored);
    }

    #[tokio::test]
    async fn test_user_ids_lists_every_user_in_order() {
        let store = create_test_store();
        assert_eq!(store.user_ids().await, vec!["1", "2", "3"]);
        assert!(InMemoryStore::new().user_ids().await.is_empty());
    }

    #[test]
    fn test_load_from_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryStore::load_from_files(dir.path()).unwrap();
        assert!(store.state.try_read().unwrap().interactions.is_empty());
    }

    #[test]
    fn test_load_rejects_invalid_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(INTERACTIONS_FILE),
            "{\"user_id\":\"\",\"taxon_id\":\"10\",\"type\":\"view\"}\n",
        )
        .unwrap();

        let err = InMemoryStore::load_from_files(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::ValidationError(_)));
    }
}
