//! The authoritative remote store contract
//!
//! The engine never talks to a concrete backend directly; it is handed an
//! implementation of this trait. All writes are idempotent-safe to retry at
//! the caller's discretion, but the engine itself does not auto-retry.

use async_trait::async_trait;

use copair_model::{Assignment, ApprovedRelation, Dataset, NewAssignment, User};

use crate::errors::Result;

/// CRUD plus the atomic server-side procedures of the authoritative store.
///
/// Validation performed here is authoritative even over callers that already
/// filtered client-side (stale-cache races are resolved in favor of the
/// remote state).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Cheap reachability check. Callers bound it with their own timeout.
    async fn probe(&self) -> Result<()>;

    /// Full pull of every entity, used by the sync cycle.
    async fn fetch_dataset(&self) -> Result<Dataset>;

    // --- users ---

    async fn create_user(&self, user: User) -> Result<User>;

    /// Update an existing user. The role is immutable: updates that change
    /// the variant are rejected with `InvalidState`.
    async fn update_user(&self, user: User) -> Result<User>;

    async fn delete_user(&self, user_id: &str) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    // --- assignments ---

    /// Create a pending assignment after authoritative duplicate-pair and
    /// service-area re-validation.
    async fn create_assignment_checked(&self, request: NewAssignment) -> Result<Assignment>;

    async fn delete_assignment(&self, assignment_id: &str) -> Result<()>;

    async fn list_assignments(&self) -> Result<Vec<Assignment>>;

    // --- relations ---

    /// Atomically consume a pending assignment into an active relation,
    /// updating both users' cross-reference fields.
    async fn approve_assignment_tx(
        &self,
        assignment_id: &str,
        approver_id: &str,
    ) -> Result<ApprovedRelation>;

    /// Atomically mark the active relation for the pair dissociated and
    /// clear both cross-references.
    async fn dissociate_relation_tx(
        &self,
        guardian_id: &str,
        tutor_id: &str,
        actor_id: &str,
    ) -> Result<ApprovedRelation>;

    async fn list_relations(&self) -> Result<Vec<ApprovedRelation>>;

    // --- messages and notifications (user deletion cascade) ---

    /// Delete every message the user sent or received, returning the count.
    async fn delete_messages_involving(&self, user_id: &str) -> Result<usize>;

    /// Delete every notification addressed to the user, returning the count.
    async fn delete_notifications_for(&self, user_id: &str) -> Result<usize>;

    // --- repair procedures ---

    /// Run the relation consistency sweep, returning the number of records
    /// fixed. Idempotent.
    async fn repair_relations(&self) -> Result<usize>;

    /// Run the assignment consistency sweep, returning the number of
    /// records fixed. Idempotent.
    async fn repair_assignments(&self) -> Result<usize>;
}
