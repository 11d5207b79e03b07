//! Error types for store operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    #[error("Duplicate pairing: guardian {guardian_id} and tutor {tutor_id} are already linked")]
    DuplicatePair {
        guardian_id: String,
        tutor_id: String,
    },

    #[error("Service area mismatch between guardian {guardian_id} and tutor {tutor_id}")]
    AreaMismatch {
        guardian_id: String,
        tutor_id: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Remote write rejected: {0}")]
    WriteRejected(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the error means the remote store could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
