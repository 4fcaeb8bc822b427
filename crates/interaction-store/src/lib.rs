//! # Interaction Store Crate
//!
//! Storage layer for user interactions with species and for feedback on
//! recommendations.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Interaction, Feedback, InteractionStats)
//! - **store**: Async repository traits the engine depends on
//! - **index**: [`InMemoryStore`], the bundled implementation of both traits
//! - **parser**: JSON-lines readers and writers for data directories
//! - **error**: Error types for storage
//!
//! ## Example Usage
//!
//! ```ignore
//! use interaction_store::{InMemoryStore, InteractionStore, Interaction, InteractionKind};
//! use std::path::Path;
//!
//! let store = InMemoryStore::load_from_files(Path::new("data"))?;
//! store
//!     .record_interaction(Interaction::new("user-1", "12345", InteractionKind::Favorite))
//!     .await?;
//!
//! let history = store.list_interactions("user-1", 100).await?;
//! println!("user-1 has {} interactions", history.len());
//! ```

// Public modules
pub mod error;
pub mod index;
pub mod parser;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
pub use index::{FEEDBACK_FILE, INTERACTIONS_FILE, InMemoryStore};
pub use parser::{parse_json_lines, parse_records, write_json_lines};
pub use store::{FeedbackStore, InteractionStore};
pub use types::{
    // Type aliases
    TaxonId,
    UserId,
    // Records
    Feedback,
    Interaction,
    // Enums
    FeedbackKind,
    InteractionKind,
    // Statistics
    InteractionStats,
    SpeciesPopularity,
};
