//! Error types.
//!
//! Only genuine failures live here. A record without coordinates is skipped by
//! the clusterer, a short query yields no suggestions, and pattern characters
//! in a query are escaped before matching; none of those surface as errors.

use thiserror::Error;

/// Errors produced by the facility map core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// The data source was unreachable or returned an unusable payload.
    #[error("failed to load {source_name}: {reason}")]
    LoadFailure { source_name: String, reason: String },

    /// No record with this id is held by the store.
    #[error("facility {0} not found")]
    NotFound(u64),

    /// The record cannot be placed on the map.
    #[error("facility {0} has no location")]
    NoLocation(u64),
}

impl MapError {
    pub(crate) fn load(source_name: &str, reason: impl ToString) -> Self {
        MapError::LoadFailure {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for failures of the external data source.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, MapError::LoadFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
