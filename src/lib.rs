//! Copair integration tests and workspace root
//!
//! This crate serves as the root of the copair workspace and contains
//! integration tests that test interactions between multiple crates.

// Re-export major components for integration testing
pub use copair_match as matching;
pub use copair_model as model;
pub use copair_store as store;
pub use copair_sync as sync;
