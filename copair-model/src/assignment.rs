//! Proposed pairings and approved relations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Which scoring criteria a pairing satisfied.
///
/// `area_match` is the mandatory criterion and is always true for any
/// persisted pairing; the other two record whether the optional bonuses
/// were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCriteria {
    pub area_match: bool,
    pub subject_match: bool,
    pub grade_match: bool,
}

/// Lifecycle state of a proposed pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Approved,
    Rejected,
}

/// A proposed, not-yet-approved pairing between a guardian and a tutor.
///
/// At most one pending assignment may exist per (guardian, tutor) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub guardian_id: UserId,
    pub tutor_id: UserId,
    pub compatibility_score: f64,
    pub criteria: AssignmentCriteria,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn is_pending(&self) -> bool {
        self.status == AssignmentStatus::Pending
    }
}

/// Request to create a new assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub guardian_id: UserId,
    pub tutor_id: UserId,
    pub compatibility_score: f64,
    pub criteria: AssignmentCriteria,
    pub created_by: UserId,
}

/// Lifecycle state of a confirmed pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationStatus {
    Active,
    Dissociated,
}

/// A confirmed pairing. History is append-only: relations are marked
/// dissociated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedRelation {
    pub id: String,
    pub guardian_id: UserId,
    pub tutor_id: UserId,
    pub approved_at: DateTime<Utc>,
    pub approved_by: UserId,
    pub compatibility_score: f64,
    pub criteria: AssignmentCriteria,
    pub status: RelationStatus,
    pub dissociated_at: Option<DateTime<Utc>>,
    pub dissociated_by: Option<UserId>,
}

impl ApprovedRelation {
    pub fn is_active(&self) -> bool {
        self.status == RelationStatus::Active
    }

    /// Mark the relation dissociated, recording actor and time
    pub fn dissociate(&mut self, actor: &str, at: DateTime<Utc>) {
        self.status = RelationStatus::Dissociated;
        self.dissociated_at = Some(at);
        self.dissociated_by = Some(actor.to_string());
    }
}
