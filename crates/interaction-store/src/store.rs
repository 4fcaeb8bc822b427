//! Repository traits for the interaction and feedback stores.
//!
//! The recommendation engine only talks to storage through these traits, so
//! a Postgres-backed implementation, a remote service client or the bundled
//! [`InMemoryStore`](crate::InMemoryStore) are interchangeable.
//!
//! Implementations must acquire and release their connection (or pooled
//! handle) per call. No call may hold a transaction open across awaits made
//! by the caller.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Feedback, Interaction, UserId};

/// Read/write contract for user interaction history.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Append an interaction.
    ///
    /// Implementations stamp the current time when `timestamp` is missing.
    /// Failures must be returned, never swallowed.
    async fn record_interaction(&self, interaction: Interaction) -> Result<()>;

    /// Most recent interactions of `user_id`, newest first, at most `limit`.
    ///
    /// An unknown user yields an empty history, not an error.
    async fn list_interactions(&self, user_id: &str, limit: usize) -> Result<Vec<Interaction>>;

    /// Every user with at least one interaction, except `user_id`.
    ///
    /// Returned as an ordered set so that callers iterate peers deterministically.
    async fn list_other_user_ids(&self, user_id: &str) -> Result<BTreeSet<UserId>>;
}

/// Read/write contract for recommendation feedback.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Append a feedback record. Failures must be returned.
    async fn record_feedback(&self, feedback: Feedback) -> Result<()>;

    /// Every stored feedback record, in insertion order.
    async fn list_feedback(&self) -> Result<Vec<Feedback>>;
}
