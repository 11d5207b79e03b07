//! Domain model for the copair engine
//!
//! This crate defines the entities shared by every other crate:
//! - Users (tutors, guardians, administrators) as a closed tagged union
//! - Assignments (proposed pairings) and approved relations
//! - Messages and notifications mirrored through sync
//! - The dataset aggregate moved wholesale between stores
//! - Pure repair planners for consistency sweeps

pub mod assignment;
pub mod dataset;
pub mod message;
pub mod repair;
pub mod user;

pub use assignment::{
    Assignment, AssignmentCriteria, AssignmentStatus, ApprovedRelation, NewAssignment,
    RelationStatus,
};
pub use dataset::Dataset;
pub use message::{Message, Notification};
pub use repair::{
    apply_assignment_repairs, apply_relation_repairs, plan_assignment_repairs,
    plan_relation_repairs, AssignmentRepairPlan, RelationRepairPlan,
};
pub use user::{Administrator, Guardian, Tutor, User, UserId, UserRole};

/// Generate a prefixed entity id (e.g. `usr_1f4a…`).
pub fn new_entity_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
