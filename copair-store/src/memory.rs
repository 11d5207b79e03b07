//! In-memory reference implementation of the remote store contract
//!
//! Used by the test suites and by local-only deployments. The `online`
//! toggle lets tests simulate connectivity loss; `inject_write_failure`
//! exercises partial-failure paths without a real backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use copair_model::{
    apply_assignment_repairs, apply_relation_repairs, new_entity_id, plan_assignment_repairs,
    plan_relation_repairs, Assignment, AssignmentStatus, ApprovedRelation, Dataset, NewAssignment,
    RelationStatus, User,
};

use crate::errors::{Result, StoreError};
use crate::remote::RemoteStore;

/// Reference authoritative store backed by a guarded dataset
pub struct MemoryRemoteStore {
    data: RwLock<Dataset>,
    online: AtomicBool,
    fail_writes: StdMutex<Option<String>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Dataset::default()),
            online: AtomicBool::new(true),
            fail_writes: StdMutex::new(None),
        }
    }

    /// Start from a pre-populated dataset
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            online: AtomicBool::new(true),
            fail_writes: StdMutex::new(None),
        }
    }

    /// Simulate connectivity loss or restoration
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with `WriteRejected(reason)`; pass `None`
    /// to restore normal operation.
    pub fn inject_write_failure(&self, reason: Option<&str>) {
        *self.fail_writes.lock().unwrap() = reason.map(str::to_string);
    }

    /// Snapshot of the authoritative contents (test assertions)
    pub async fn dump(&self) -> Dataset {
        self.data.read().await.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unreachable("remote store offline".to_string()))
        }
    }

    fn check_writable(&self) -> Result<()> {
        self.check_reachable()?;
        if let Some(reason) = self.fail_writes.lock().unwrap().as_ref() {
            return Err(StoreError::WriteRejected(reason.clone()));
        }
        Ok(())
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn probe(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn fetch_dataset(&self) -> Result<Dataset> {
        self.check_reachable()?;
        Ok(self.data.read().await.clone())
    }

    async fn create_user(&self, user: User) -> Result<User> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        if data.find_user(user.id()).is_some() {
            return Err(StoreError::InvalidState(format!(
                "user {} already exists",
                user.id()
            )));
        }
        data.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<User> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let existing = data
            .users
            .iter_mut()
            .find(|u| u.id() == user.id())
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id())))?;
        if existing.role() != user.role() {
            return Err(StoreError::InvalidState(format!(
                "user {} cannot change role",
                user.id()
            )));
        }
        *existing = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let before = data.users.len();
        data.users.retain(|u| u.id() != user_id);
        if data.users.len() == before {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.check_reachable()?;
        Ok(self.data.read().await.find_user(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.check_reachable()?;
        Ok(self.data.read().await.users.clone())
    }

    async fn create_assignment_checked(&self, request: NewAssignment) -> Result<Assignment> {
        self.check_writable()?;
        let mut data = self.data.write().await;

        let guardian = data
            .find_guardian(&request.guardian_id)
            .ok_or_else(|| StoreError::NotFound(format!("guardian {}", request.guardian_id)))?;
        let tutor = data
            .find_tutor(&request.tutor_id)
            .ok_or_else(|| StoreError::NotFound(format!("tutor {}", request.tutor_id)))?;

        // Authoritative area re-validation, independent of caller filtering
        let areas_match = match (&guardian.service_area, &tutor.service_area) {
            (Some(g), Some(t)) => g == t,
            _ => false,
        };
        if !areas_match {
            return Err(StoreError::AreaMismatch {
                guardian_id: request.guardian_id,
                tutor_id: request.tutor_id,
            });
        }

        if data.pair_is_linked(&request.guardian_id, &request.tutor_id) {
            return Err(StoreError::DuplicatePair {
                guardian_id: request.guardian_id,
                tutor_id: request.tutor_id,
            });
        }

        let assignment = Assignment {
            id: new_entity_id("asg"),
            guardian_id: request.guardian_id,
            tutor_id: request.tutor_id,
            compatibility_score: request.compatibility_score,
            criteria: request.criteria,
            created_by: request.created_by,
            created_at: Utc::now(),
            status: AssignmentStatus::Pending,
        };
        data.assignments.push(assignment.clone());
        debug!(id = %assignment.id, "Created assignment");
        Ok(assignment)
    }

    async fn delete_assignment(&self, assignment_id: &str) -> Result<()> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let before = data.assignments.len();
        data.assignments.retain(|a| a.id != assignment_id);
        if data.assignments.len() == before {
            return Err(StoreError::NotFound(format!("assignment {assignment_id}")));
        }
        Ok(())
    }

    async fn list_assignments(&self) -> Result<Vec<Assignment>> {
        self.check_reachable()?;
        Ok(self.data.read().await.assignments.clone())
    }

    async fn approve_assignment_tx(
        &self,
        assignment_id: &str,
        approver_id: &str,
    ) -> Result<ApprovedRelation> {
        self.check_writable()?;
        let mut data = self.data.write().await;

        let assignment = data
            .assignments
            .iter()
            .find(|a| a.id == assignment_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("assignment {assignment_id}")))?;
        if !assignment.is_pending() {
            return Err(StoreError::InvalidState(format!(
                "assignment {assignment_id} is not pending"
            )));
        }

        let tutor = data
            .find_tutor(&assignment.tutor_id)
            .ok_or_else(|| StoreError::NotFound(format!("tutor {}", assignment.tutor_id)))?;
        if !tutor.has_capacity() {
            return Err(StoreError::InvalidState(format!(
                "tutor {} is at capacity",
                assignment.tutor_id
            )));
        }
        if data.find_guardian(&assignment.guardian_id).is_none() {
            return Err(StoreError::NotFound(format!(
                "guardian {}",
                assignment.guardian_id
            )));
        }

        let relation = ApprovedRelation {
            id: new_entity_id("rel"),
            guardian_id: assignment.guardian_id.clone(),
            tutor_id: assignment.tutor_id.clone(),
            approved_at: Utc::now(),
            approved_by: approver_id.to_string(),
            compatibility_score: assignment.compatibility_score,
            criteria: assignment.criteria,
            status: RelationStatus::Active,
            dissociated_at: None,
            dissociated_by: None,
        };

        // Retire the consumed assignment and wire up both cross-references.
        data.assignments.retain(|a| a.id != assignment_id);
        data.relations.push(relation.clone());
        for user in &mut data.users {
            match user {
                User::Guardian(g) if g.id == relation.guardian_id => {
                    g.assigned_tutor = Some(relation.tutor_id.clone());
                }
                User::Tutor(t) if t.id == relation.tutor_id => {
                    if !t.assigned_learners.iter().any(|l| *l == relation.guardian_id) {
                        t.assigned_learners.push(relation.guardian_id.clone());
                    }
                }
                _ => {}
            }
        }

        debug!(id = %relation.id, "Approved assignment into relation");
        Ok(relation)
    }

    async fn dissociate_relation_tx(
        &self,
        guardian_id: &str,
        tutor_id: &str,
        actor_id: &str,
    ) -> Result<ApprovedRelation> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let now = Utc::now();

        let relation = data
            .relations
            .iter_mut()
            .find(|r| r.is_active() && r.guardian_id == guardian_id && r.tutor_id == tutor_id)
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "active relation between {guardian_id} and {tutor_id}"
                ))
            })?;
        relation.dissociate(actor_id, now);
        let dissociated = relation.clone();

        for user in &mut data.users {
            match user {
                User::Guardian(g)
                    if g.id == guardian_id && g.assigned_tutor.as_deref() == Some(tutor_id) =>
                {
                    g.assigned_tutor = None;
                }
                User::Tutor(t) if t.id == tutor_id => {
                    t.assigned_learners.retain(|l| l != guardian_id);
                }
                _ => {}
            }
        }

        debug!(id = %dissociated.id, "Dissociated relation");
        Ok(dissociated)
    }

    async fn list_relations(&self) -> Result<Vec<ApprovedRelation>> {
        self.check_reachable()?;
        Ok(self.data.read().await.relations.clone())
    }

    async fn delete_messages_involving(&self, user_id: &str) -> Result<usize> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let before = data.messages.len();
        data.messages.retain(|m| !m.involves(user_id));
        Ok(before - data.messages.len())
    }

    async fn delete_notifications_for(&self, user_id: &str) -> Result<usize> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let before = data.notifications.len();
        data.notifications.retain(|n| n.user_id != user_id);
        Ok(before - data.notifications.len())
    }

    async fn repair_relations(&self) -> Result<usize> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let plan = plan_relation_repairs(&data);
        Ok(apply_relation_repairs(&mut data, &plan, "system", Utc::now()))
    }

    async fn repair_assignments(&self) -> Result<usize> {
        self.check_writable()?;
        let mut data = self.data.write().await;
        let plan = plan_assignment_repairs(&data);
        Ok(apply_assignment_repairs(&mut data, &plan))
    }
}
