//! The confession store contract shared by local and remote backends.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::Database;
use crate::models::{ConfessionRecord, CreateConfessionInput, ValidationError};

/// Failures of a single create or get call.
///
/// None of these are fatal; each is scoped to the action that triggered it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field was empty. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No confession exists under the requested id.
    #[error("Confession not found: {0}")]
    NotFound(String),

    /// The call did not complete. The caller may retry the same action.
    #[error("Confession store unavailable: {0}")]
    Transport(String),
}

/// Persists confession records and returns them by id.
///
/// There is no update or delete. Concurrent `create` calls must never merge
/// or corrupt records; identical content under two calls yields two records.
#[async_trait]
pub trait ConfessionStore: Send + Sync {
    async fn create(&self, input: CreateConfessionInput) -> Result<ConfessionRecord, StoreError>;

    async fn get(&self, id: &str) -> Result<ConfessionRecord, StoreError>;
}

#[async_trait]
impl ConfessionStore for Database {
    async fn create(&self, input: CreateConfessionInput) -> Result<ConfessionRecord, StoreError> {
        self.create_confession(input).map_err(|e| match e.downcast::<ValidationError>() {
            Ok(validation) => StoreError::Validation(validation),
            Err(other) => {
                tracing::error!("Failed to store confession: {:#}", other);
                StoreError::Transport(other.to_string())
            }
        })
    }

    async fn get(&self, id: &str) -> Result<ConfessionRecord, StoreError> {
        match self.get_confession(id) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => {
                tracing::error!("Failed to load confession {}: {:#}", id, e);
                Err(StoreError::Transport(e.to_string()))
            }
        }
    }
}
