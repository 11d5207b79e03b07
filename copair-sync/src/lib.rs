//! Synchronization engine for copair
//!
//! This crate provides the coordinator that keeps the local mirror
//! consistent with the authoritative remote store:
//! - Single-writer sync lifecycle with a FIFO, coalescing trigger queue
//! - Atomically swapped cache snapshot for readers during in-flight syncs
//! - Write-through mutation path (remote first, then the mirror)
//! - Offline degradation and the sync-completed event surface

pub mod cache;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod queue;
pub mod triggers;

pub use cache::{CacheLayer, CacheSnapshot};
pub use coordinator::{SyncConfig, SyncCoordinator, SyncState, SyncStatus};
pub use errors::{Result, SyncError};
pub use events::{host_signal_channel, HostSignal, SyncEvent};
pub use queue::SyncTrigger;
pub use triggers::spawn_triggers;
