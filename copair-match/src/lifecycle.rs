//! Assignment lifecycle: create, approve, dissociate, repair
//!
//! All persistence goes through the coordinator's write path (remote first,
//! then the local mirror). Repair passes run after every approve and
//! dissociate; they log failures and never raise.

use std::sync::Arc;

use tracing::{debug, info, warn};

use copair_model::{Assignment, ApprovedRelation, NewAssignment};
use copair_store::StoreError;
use copair_sync::SyncCoordinator;

use crate::engine::propose_pairings;
use crate::errors::Result;

/// Outcome of one matching run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRunReport {
    pub proposed: usize,
    pub created: usize,
    pub failed: usize,
}

/// Drives proposed pairings through their lifecycle
pub struct AssignmentLifecycle {
    coordinator: Arc<SyncCoordinator>,
}

impl AssignmentLifecycle {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Create a pending assignment. Fails with `DuplicatePair` when a
    /// pending assignment or active relation already links the pair, and
    /// with `AreaMismatch` when the authoritative re-validation rejects the
    /// areas — even for callers that already filtered client-side.
    pub async fn create(&self, request: NewAssignment) -> Result<Assignment> {
        let dataset = self.coordinator.current_dataset().await;
        if dataset.pair_is_linked(&request.guardian_id, &request.tutor_id) {
            return Err(StoreError::DuplicatePair {
                guardian_id: request.guardian_id,
                tutor_id: request.tutor_id,
            }
            .into());
        }

        let assignment = self.coordinator.create_assignment(request).await?;
        info!(id = %assignment.id, guardian = %assignment.guardian_id,
              tutor = %assignment.tutor_id, score = assignment.compatibility_score,
              "Created assignment");
        Ok(assignment)
    }

    /// Atomically approve a pending assignment into an active relation.
    /// Fails with `NotFound` when the assignment was already consumed or
    /// removed by a concurrent actor, `InvalidState` when it is not
    /// pending. Triggers the repair passes afterward.
    pub async fn approve(
        &self,
        assignment_id: &str,
        approver_id: &str,
    ) -> Result<ApprovedRelation> {
        let relation = self
            .coordinator
            .approve_assignment(assignment_id, approver_id)
            .await?;
        info!(relation_id = %relation.id, guardian = %relation.guardian_id,
              tutor = %relation.tutor_id, "Approved assignment");

        self.run_repairs().await;
        Ok(relation)
    }

    /// Mark the active relation for a pair dissociated, clearing both
    /// cross-references. Fails with `NotFound` when no active relation
    /// exists. Triggers the repair passes afterward.
    pub async fn dissociate(
        &self,
        guardian_id: &str,
        tutor_id: &str,
        actor_id: &str,
    ) -> Result<ApprovedRelation> {
        let relation = self
            .coordinator
            .dissociate_relation(guardian_id, tutor_id, actor_id)
            .await?;
        info!(relation_id = %relation.id, "Dissociated relation");

        self.run_repairs().await;
        Ok(relation)
    }

    /// Run the relation consistency sweep. Logs and returns 0 on failure —
    /// a single unrepairable record must not abort anything.
    pub async fn repair_relations(&self) -> usize {
        match self.coordinator.repair_relations().await {
            Ok(fixed) => {
                if fixed > 0 {
                    info!(fixed, "Relation repair pass fixed records");
                }
                fixed
            }
            Err(e) => {
                warn!(error = %e, "Relation repair pass failed");
                0
            }
        }
    }

    /// Run the assignment consistency sweep. Logs and returns 0 on failure.
    pub async fn repair_assignments(&self) -> usize {
        match self.coordinator.repair_assignments().await {
            Ok(fixed) => {
                if fixed > 0 {
                    info!(fixed, "Assignment repair pass fixed records");
                }
                fixed
            }
            Err(e) => {
                warn!(error = %e, "Assignment repair pass failed");
                0
            }
        }
    }

    async fn run_repairs(&self) {
        self.repair_relations().await;
        self.repair_assignments().await;
    }

    /// Run the matching engine over the coordinator's current view and
    /// persist the proposals in ranked order, best-effort: an individual
    /// failure is logged and the remaining proposals still go through.
    pub async fn run_matching(&self, initiated_by: &str) -> MatchRunReport {
        let dataset = self.coordinator.current_dataset().await;
        let proposals =
            propose_pairings(&dataset.users, &dataset.assignments, &dataset.relations);

        let mut report = MatchRunReport {
            proposed: proposals.len(),
            ..Default::default()
        };

        for proposal in proposals {
            let request = NewAssignment {
                guardian_id: proposal.guardian_id,
                tutor_id: proposal.tutor_id,
                compatibility_score: proposal.score,
                criteria: proposal.criteria,
                created_by: initiated_by.to_string(),
            };
            match self.coordinator.create_assignment(request).await {
                Ok(assignment) => {
                    debug!(id = %assignment.id, "Persisted proposed pairing");
                    report.created += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to persist proposal, continuing");
                    report.failed += 1;
                }
            }
        }

        info!(
            proposed = report.proposed,
            created = report.created,
            failed = report.failed,
            "Matching run finished"
        );
        report
    }
}
