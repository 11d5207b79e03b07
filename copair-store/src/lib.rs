//! Storage boundary for the copair engine
//!
//! This crate defines the authoritative remote store contract, a reference
//! in-memory implementation of it, and the SQLite-backed local mirror the
//! sync engine overwrites on each successful pull.

pub mod errors;
pub mod local;
pub mod memory;
pub mod remote;
pub mod schema;

pub use errors::{Result, StoreError};
pub use local::{AsyncLocalStore, LocalStore};
pub use memory::MemoryRemoteStore;
pub use remote::RemoteStore;
