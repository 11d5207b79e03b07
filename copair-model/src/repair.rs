//! Pure repair planners for consistency sweeps
//!
//! The planners scan a dataset and produce an explicit plan of corrections;
//! applying a plan and re-planning on the result yields an empty plan, which
//! is what makes the repair passes idempotent.

use std::collections::{HashMap, HashSet};

use crate::assignment::{Assignment, ApprovedRelation};
use crate::dataset::Dataset;
use crate::user::{User, UserId};

/// Corrections for the assignments table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentRepairPlan {
    /// Assignment ids to remove (orphaned, already consumed, or duplicated)
    pub remove: Vec<String>,
}

impl AssignmentRepairPlan {
    pub fn fixed_count(&self) -> usize {
        self.remove.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty()
    }
}

/// Corrections for relations and user cross-reference fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationRepairPlan {
    /// Relation ids to mark dissociated (never deleted)
    pub retire: Vec<String>,
    /// Guardians whose `assigned_tutor` must be cleared
    pub clear_assigned_tutor: Vec<UserId>,
    /// (guardian, tutor) pairs where `assigned_tutor` must be set
    pub set_assigned_tutor: Vec<(UserId, UserId)>,
    /// (tutor, learner) memberships to drop from `assigned_learners`
    pub remove_learner: Vec<(UserId, UserId)>,
    /// (tutor, learner) memberships to add to `assigned_learners`
    pub add_learner: Vec<(UserId, UserId)>,
}

impl RelationRepairPlan {
    pub fn fixed_count(&self) -> usize {
        self.retire.len()
            + self.clear_assigned_tutor.len()
            + self.set_assigned_tutor.len()
            + self.remove_learner.len()
            + self.add_learner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed_count() == 0
    }
}

fn user_ids(users: &[User]) -> HashSet<&str> {
    users.iter().map(User::id).collect()
}

fn active_relations(relations: &[ApprovedRelation]) -> impl Iterator<Item = &ApprovedRelation> {
    relations.iter().filter(|r| r.is_active())
}

/// Plan removal of orphaned, consumed and duplicated assignments.
pub fn plan_assignment_repairs(dataset: &Dataset) -> AssignmentRepairPlan {
    let known = user_ids(&dataset.users);
    let mut remove = Vec::new();
    let mut seen_pending: HashMap<(&str, &str), &Assignment> = HashMap::new();

    let actively_paired: HashSet<(&str, &str)> = active_relations(&dataset.relations)
        .map(|r| (r.guardian_id.as_str(), r.tutor_id.as_str()))
        .collect();

    for assignment in &dataset.assignments {
        // Orphaned: either side no longer exists
        if !known.contains(assignment.guardian_id.as_str())
            || !known.contains(assignment.tutor_id.as_str())
        {
            remove.push(assignment.id.clone());
            continue;
        }

        // Consumed or rejected records should have been retired on approval
        if !assignment.is_pending() {
            remove.push(assignment.id.clone());
            continue;
        }

        let pair = (assignment.guardian_id.as_str(), assignment.tutor_id.as_str());

        // The couple is already actively paired
        if actively_paired.contains(&pair) {
            remove.push(assignment.id.clone());
            continue;
        }

        // Duplicate pending assignments for one pair: earliest wins
        match seen_pending.get(&pair) {
            None => {
                seen_pending.insert(pair, assignment);
            }
            Some(kept) => {
                if assignment.created_at < kept.created_at {
                    remove.push(kept.id.clone());
                    seen_pending.insert(pair, assignment);
                } else {
                    remove.push(assignment.id.clone());
                }
            }
        }
    }

    AssignmentRepairPlan { remove }
}

/// Plan retirement of inconsistent relations and reconciliation of user
/// cross-reference fields against the surviving active relations.
pub fn plan_relation_repairs(dataset: &Dataset) -> RelationRepairPlan {
    let known = user_ids(&dataset.users);
    let mut plan = RelationRepairPlan::default();

    // Pass 1: decide which active relations survive.
    let mut survivors: Vec<&ApprovedRelation> = Vec::new();
    let mut seen_pair: HashMap<(&str, &str), usize> = HashMap::new();
    let mut guardian_taken: HashMap<&str, usize> = HashMap::new();

    for relation in active_relations(&dataset.relations) {
        if !known.contains(relation.guardian_id.as_str())
            || !known.contains(relation.tutor_id.as_str())
        {
            plan.retire.push(relation.id.clone());
            continue;
        }

        let pair = (relation.guardian_id.as_str(), relation.tutor_id.as_str());
        if let Some(&idx) = seen_pair.get(&pair) {
            // Duplicate active relation for one pair: earliest approval wins
            let kept: &ApprovedRelation = survivors[idx];
            if relation.approved_at < kept.approved_at {
                plan.retire.push(kept.id.clone());
                survivors[idx] = relation;
            } else {
                plan.retire.push(relation.id.clone());
            }
            continue;
        }

        if let Some(&idx) = guardian_taken.get(relation.guardian_id.as_str()) {
            // A guardian can hold at most one active relation
            let kept: &ApprovedRelation = survivors[idx];
            if relation.approved_at < kept.approved_at {
                plan.retire.push(kept.id.clone());
                seen_pair.remove(&(kept.guardian_id.as_str(), kept.tutor_id.as_str()));
                survivors[idx] = relation;
                seen_pair.insert(pair, idx);
            } else {
                plan.retire.push(relation.id.clone());
            }
            continue;
        }

        let idx = survivors.len();
        survivors.push(relation);
        seen_pair.insert(pair, idx);
        guardian_taken.insert(relation.guardian_id.as_str(), idx);
    }

    // Pass 2: reconcile user cross-references with the survivors.
    let tutor_of_guardian: HashMap<&str, &str> = survivors
        .iter()
        .map(|r| (r.guardian_id.as_str(), r.tutor_id.as_str()))
        .collect();
    let mut learners_of_tutor: HashMap<&str, HashSet<&str>> = HashMap::new();
    for relation in &survivors {
        learners_of_tutor
            .entry(relation.tutor_id.as_str())
            .or_default()
            .insert(relation.guardian_id.as_str());
    }

    for user in &dataset.users {
        match user {
            User::Guardian(guardian) => {
                let expected = tutor_of_guardian.get(guardian.id.as_str()).copied();
                match (guardian.assigned_tutor.as_deref(), expected) {
                    (Some(current), Some(wanted)) if current != wanted => {
                        plan.set_assigned_tutor
                            .push((guardian.id.clone(), wanted.to_string()));
                    }
                    (Some(_), None) => {
                        plan.clear_assigned_tutor.push(guardian.id.clone());
                    }
                    (None, Some(wanted)) => {
                        plan.set_assigned_tutor
                            .push((guardian.id.clone(), wanted.to_string()));
                    }
                    _ => {}
                }
            }
            User::Tutor(tutor) => {
                let expected = learners_of_tutor
                    .get(tutor.id.as_str())
                    .cloned()
                    .unwrap_or_default();
                let current: HashSet<&str> =
                    tutor.assigned_learners.iter().map(String::as_str).collect();

                for learner in &tutor.assigned_learners {
                    if !expected.contains(learner.as_str()) {
                        plan.remove_learner.push((tutor.id.clone(), learner.clone()));
                    }
                }
                let mut missing: Vec<&str> = expected
                    .iter()
                    .filter(|l| !current.contains(**l))
                    .copied()
                    .collect();
                missing.sort_unstable();
                for learner in missing {
                    plan.add_learner.push((tutor.id.clone(), learner.to_string()));
                }
            }
            User::Administrator(_) => {}
        }
    }

    plan
}

/// Apply an assignment plan to a dataset in place. Used by authoritative
/// store implementations; returns the number of records fixed.
pub fn apply_assignment_repairs(dataset: &mut Dataset, plan: &AssignmentRepairPlan) -> usize {
    if plan.is_empty() {
        return 0;
    }
    let doomed: HashSet<&str> = plan.remove.iter().map(String::as_str).collect();
    dataset.assignments.retain(|a| !doomed.contains(a.id.as_str()));
    plan.fixed_count()
}

/// Apply a relation plan to a dataset in place, retiring relations and
/// rewriting the affected cross-reference fields.
pub fn apply_relation_repairs(
    dataset: &mut Dataset,
    plan: &RelationRepairPlan,
    actor: &str,
    at: chrono::DateTime<chrono::Utc>,
) -> usize {
    if plan.is_empty() {
        return 0;
    }

    let retire: HashSet<&str> = plan.retire.iter().map(String::as_str).collect();
    for relation in &mut dataset.relations {
        if retire.contains(relation.id.as_str()) && relation.is_active() {
            relation.dissociate(actor, at);
        }
    }

    let clear: HashSet<&str> = plan.clear_assigned_tutor.iter().map(String::as_str).collect();
    let set: HashMap<&str, &str> = plan
        .set_assigned_tutor
        .iter()
        .map(|(g, t)| (g.as_str(), t.as_str()))
        .collect();
    let mut remove: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (tutor, learner) in &plan.remove_learner {
        remove.entry(tutor.as_str()).or_default().insert(learner.as_str());
    }
    let mut add: HashMap<&str, Vec<&str>> = HashMap::new();
    for (tutor, learner) in &plan.add_learner {
        add.entry(tutor.as_str()).or_default().push(learner.as_str());
    }

    for user in &mut dataset.users {
        match user {
            User::Guardian(guardian) => {
                if clear.contains(guardian.id.as_str()) {
                    guardian.assigned_tutor = None;
                } else if let Some(tutor) = set.get(guardian.id.as_str()) {
                    guardian.assigned_tutor = Some((*tutor).to_string());
                }
            }
            User::Tutor(tutor) => {
                if let Some(doomed) = remove.get(tutor.id.as_str()) {
                    tutor
                        .assigned_learners
                        .retain(|l| !doomed.contains(l.as_str()));
                }
                if let Some(new) = add.get(tutor.id.as_str()) {
                    for learner in new {
                        if !tutor.assigned_learners.iter().any(|l| l == learner) {
                            tutor.assigned_learners.push((*learner).to_string());
                        }
                    }
                }
            }
            User::Administrator(_) => {}
        }
    }

    plan.fixed_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{AssignmentCriteria, AssignmentStatus, RelationStatus};
    use crate::user::{Guardian, Tutor};
    use chrono::{Duration, Utc};

    fn criteria() -> AssignmentCriteria {
        AssignmentCriteria {
            area_match: true,
            subject_match: false,
            grade_match: false,
        }
    }

    fn guardian(id: &str, assigned_tutor: Option<&str>) -> User {
        User::Guardian(Guardian {
            id: id.to_string(),
            display_name: id.to_string(),
            email: format!("{id}@example.com"),
            service_area: Some("Zone A".to_string()),
            grade_level: None,
            needs: Default::default(),
            assigned_tutor: assigned_tutor.map(str::to_string),
            created_at: Utc::now(),
        })
    }

    fn tutor(id: &str, learners: &[&str]) -> User {
        User::Tutor(Tutor {
            id: id.to_string(),
            display_name: id.to_string(),
            email: format!("{id}@example.com"),
            service_area: Some("Zone A".to_string()),
            subjects: Default::default(),
            grade_levels: Default::default(),
            assigned_learners: learners.iter().map(|l| l.to_string()).collect(),
            max_learners: 4,
            created_at: Utc::now(),
        })
    }

    fn assignment(id: &str, guardian_id: &str, tutor_id: &str, age_secs: i64) -> Assignment {
        Assignment {
            id: id.to_string(),
            guardian_id: guardian_id.to_string(),
            tutor_id: tutor_id.to_string(),
            compatibility_score: 0.75,
            criteria: criteria(),
            created_by: "adm_1".to_string(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            status: AssignmentStatus::Pending,
        }
    }

    fn relation(id: &str, guardian_id: &str, tutor_id: &str, age_secs: i64) -> ApprovedRelation {
        ApprovedRelation {
            id: id.to_string(),
            guardian_id: guardian_id.to_string(),
            tutor_id: tutor_id.to_string(),
            approved_at: Utc::now() - Duration::seconds(age_secs),
            approved_by: "adm_1".to_string(),
            compatibility_score: 0.75,
            criteria: criteria(),
            status: RelationStatus::Active,
            dissociated_at: None,
            dissociated_by: None,
        }
    }

    #[test]
    fn test_orphaned_assignment_removed() {
        let mut dataset = Dataset {
            users: vec![guardian("g1", None)],
            assignments: vec![assignment("a1", "g1", "t_missing", 0)],
            ..Default::default()
        };

        let plan = plan_assignment_repairs(&dataset);
        assert_eq!(plan.remove, vec!["a1".to_string()]);

        let fixed = apply_assignment_repairs(&mut dataset, &plan);
        assert_eq!(fixed, 1);
        assert!(plan_assignment_repairs(&dataset).is_empty());
    }

    #[test]
    fn test_duplicate_pending_keeps_earliest() {
        let dataset = Dataset {
            users: vec![guardian("g1", None), tutor("t1", &[])],
            assignments: vec![
                assignment("a_new", "g1", "t1", 10),
                assignment("a_old", "g1", "t1", 100),
            ],
            ..Default::default()
        };

        let plan = plan_assignment_repairs(&dataset);
        assert_eq!(plan.remove, vec!["a_new".to_string()]);
    }

    #[test]
    fn test_pending_removed_when_pair_active() {
        let dataset = Dataset {
            users: vec![guardian("g1", Some("t1")), tutor("t1", &["g1"])],
            assignments: vec![assignment("a1", "g1", "t1", 0)],
            relations: vec![relation("r1", "g1", "t1", 50)],
            ..Default::default()
        };

        let plan = plan_assignment_repairs(&dataset);
        assert_eq!(plan.remove, vec!["a1".to_string()]);
    }

    #[test]
    fn test_orphaned_relation_retired_not_deleted() {
        let mut dataset = Dataset {
            users: vec![tutor("t1", &["g_missing"])],
            relations: vec![relation("r1", "g_missing", "t1", 0)],
            ..Default::default()
        };

        let plan = plan_relation_repairs(&dataset);
        assert_eq!(plan.retire, vec!["r1".to_string()]);
        assert_eq!(
            plan.remove_learner,
            vec![("t1".to_string(), "g_missing".to_string())]
        );

        let fixed = apply_relation_repairs(&mut dataset, &plan, "system", Utc::now());
        assert_eq!(fixed, 2);
        assert_eq!(dataset.relations.len(), 1);
        assert_eq!(dataset.relations[0].status, RelationStatus::Dissociated);
        assert!(plan_relation_repairs(&dataset).is_empty());
    }

    #[test]
    fn test_cross_references_reconciled() {
        // Relation says g1<->t1, but the guardian points elsewhere and the
        // tutor's roster is missing the learner.
        let mut dataset = Dataset {
            users: vec![
                guardian("g1", Some("t_other")),
                tutor("t1", &[]),
                tutor("t_other", &[]),
            ],
            relations: vec![relation("r1", "g1", "t1", 0)],
            ..Default::default()
        };

        let plan = plan_relation_repairs(&dataset);
        assert_eq!(
            plan.set_assigned_tutor,
            vec![("g1".to_string(), "t1".to_string())]
        );
        assert_eq!(plan.add_learner, vec![("t1".to_string(), "g1".to_string())]);

        apply_relation_repairs(&mut dataset, &plan, "system", Utc::now());
        assert!(plan_relation_repairs(&dataset).is_empty());

        let fixed_guardian = dataset.find_guardian("g1").unwrap();
        assert_eq!(fixed_guardian.assigned_tutor.as_deref(), Some("t1"));
        let fixed_tutor = dataset.find_tutor("t1").unwrap();
        assert_eq!(fixed_tutor.assigned_learners, vec!["g1".to_string()]);
    }

    #[test]
    fn test_idempotent_on_clean_dataset() {
        let dataset = Dataset {
            users: vec![guardian("g1", Some("t1")), tutor("t1", &["g1"])],
            relations: vec![relation("r1", "g1", "t1", 0)],
            ..Default::default()
        };

        assert!(plan_assignment_repairs(&dataset).is_empty());
        assert!(plan_relation_repairs(&dataset).is_empty());
    }
}
