//! The strategy seam.

use crate::error::Result;
use crate::types::{Algorithm, StrategyOutput};
use crate::user_context::UserContext;
use async_trait::async_trait;

/// A recommendation strategy.
///
/// Implementations read whatever history they need from the interaction
/// store and rank the context's candidates. They must never return a seen
/// species, a species outside the candidate batch, or more than
/// `context.limit` results.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Tag attached to every result this strategy produces
    fn algorithm(&self) -> Algorithm;

    async fn score(&self, context: &UserContext) -> Result<StrategyOutput>;
}
