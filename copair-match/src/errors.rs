//! Error types for matching and lifecycle operations

use thiserror::Error;

use copair_store::StoreError;
use copair_sync::SyncError;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MatchError {
    /// The underlying store error, if the failure originated there
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            MatchError::Store(e) => Some(e),
            MatchError::Sync(SyncError::Store(e)) => Some(e),
            MatchError::Sync(_) => None,
        }
    }

    pub fn is_duplicate_pair(&self) -> bool {
        matches!(self.store_error(), Some(StoreError::DuplicatePair { .. }))
    }

    pub fn is_area_mismatch(&self) -> bool {
        matches!(self.store_error(), Some(StoreError::AreaMismatch { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.store_error(), Some(StoreError::NotFound(_)))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self.store_error(), Some(StoreError::InvalidState(_)))
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
