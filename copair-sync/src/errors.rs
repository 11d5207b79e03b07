//! Error types for sync operations

use std::time::Duration;
use thiserror::Error;

use copair_store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Coordinator is offline")]
    Offline,

    #[error("Connectivity probe timed out after {0:?}")]
    ProbeTimeout(Duration),
}

impl SyncError {
    /// Whether the failure is a connectivity problem rather than a rejected
    /// operation. Read paths degrade on these instead of surfacing them.
    pub fn is_connectivity(&self) -> bool {
        match self {
            SyncError::Offline | SyncError::ProbeTimeout(_) => true,
            SyncError::Store(e) => e.is_connectivity(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
