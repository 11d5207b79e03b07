//! The full materialized view moved between stores during a sync

use serde::{Deserialize, Serialize};

use crate::assignment::{Assignment, ApprovedRelation};
use crate::message::{Message, Notification};
use crate::user::{Guardian, Tutor, User};

/// Everything the remote store holds, pulled wholesale on each sync and
/// replacing the local mirror in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub users: Vec<User>,
    pub assignments: Vec<Assignment>,
    pub relations: Vec<ApprovedRelation>,
    pub messages: Vec<Message>,
    pub notifications: Vec<Notification>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.assignments.is_empty()
            && self.relations.is_empty()
            && self.messages.is_empty()
            && self.notifications.is_empty()
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id() == id)
    }

    pub fn find_tutor(&self, id: &str) -> Option<&Tutor> {
        self.find_user(id).and_then(User::as_tutor)
    }

    pub fn find_guardian(&self, id: &str) -> Option<&Guardian> {
        self.find_user(id).and_then(User::as_guardian)
    }

    /// Whether a pending assignment or an active relation already links the
    /// pair. Such a pair must not be proposed or persisted again.
    pub fn pair_is_linked(&self, guardian_id: &str, tutor_id: &str) -> bool {
        let pending = self.assignments.iter().any(|a| {
            a.is_pending() && a.guardian_id == guardian_id && a.tutor_id == tutor_id
        });
        let active = self.relations.iter().any(|r| {
            r.is_active() && r.guardian_id == guardian_id && r.tutor_id == tutor_id
        });
        pending || active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{AssignmentCriteria, AssignmentStatus, RelationStatus};
    use chrono::Utc;

    fn pending_assignment(guardian_id: &str, tutor_id: &str) -> Assignment {
        Assignment {
            id: "asg_1".to_string(),
            guardian_id: guardian_id.to_string(),
            tutor_id: tutor_id.to_string(),
            compatibility_score: 0.75,
            criteria: AssignmentCriteria {
                area_match: true,
                subject_match: false,
                grade_match: false,
            },
            created_by: "adm_1".to_string(),
            created_at: Utc::now(),
            status: AssignmentStatus::Pending,
        }
    }

    #[test]
    fn test_pair_is_linked() {
        let mut dataset = Dataset::default();
        assert!(!dataset.pair_is_linked("g1", "t1"));

        dataset.assignments.push(pending_assignment("g1", "t1"));
        assert!(dataset.pair_is_linked("g1", "t1"));
        assert!(!dataset.pair_is_linked("g1", "t2"));

        // A dissociated relation does not link the pair
        dataset.assignments.clear();
        dataset.relations.push(ApprovedRelation {
            id: "rel_1".to_string(),
            guardian_id: "g1".to_string(),
            tutor_id: "t1".to_string(),
            approved_at: Utc::now(),
            approved_by: "adm_1".to_string(),
            compatibility_score: 0.75,
            criteria: AssignmentCriteria {
                area_match: true,
                subject_match: false,
                grade_match: false,
            },
            status: RelationStatus::Dissociated,
            dissociated_at: Some(Utc::now()),
            dissociated_by: Some("adm_1".to_string()),
        });
        assert!(!dataset.pair_is_linked("g1", "t1"));
    }
}
