//! Compatibility scoring and candidate generation
//!
//! The engine is a pure function of its inputs: given the current users,
//! pending assignments and active relations, it produces an ordered list of
//! proposed pairings. Persistence is the lifecycle's job.

use std::collections::HashSet;

use copair_model::{
    Assignment, AssignmentCriteria, ApprovedRelation, Guardian, Tutor, User, UserId,
};

/// Score awarded for satisfying the mandatory service-area constraint
pub const BASE_SCORE: f64 = 0.75;
/// Maximum bonus for covering the guardian's named needs
pub const SUBJECT_BONUS: f64 = 0.15;
/// Flat bonus for covering the guardian's grade level
pub const GRADE_BONUS: f64 = 0.10;

/// A proposed pairing, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct MatchProposal {
    pub guardian_id: UserId,
    pub tutor_id: UserId,
    pub score: f64,
    pub criteria: AssignmentCriteria,
}

/// Score a pair that already passed the area constraint.
///
/// The subject bonus scales with the fraction of the guardian's needs the
/// tutor covers and is skipped entirely when the guardian named none; the
/// grade bonus is flat. The result is clamped to 1.0 and the criteria
/// record exactly which bonuses applied.
pub fn score_pair(guardian: &Guardian, tutor: &Tutor) -> (f64, AssignmentCriteria) {
    let mut score = BASE_SCORE;
    let mut criteria = AssignmentCriteria {
        area_match: true,
        subject_match: false,
        grade_match: false,
    };

    if !guardian.needs.is_empty() {
        let covered = guardian.needs.intersection(&tutor.subjects).count();
        if covered > 0 {
            score += SUBJECT_BONUS * (covered as f64 / guardian.needs.len() as f64);
            criteria.subject_match = true;
        }
    }

    if let Some(grade) = &guardian.grade_level {
        if tutor.grade_levels.contains(grade) {
            score += GRADE_BONUS;
            criteria.grade_match = true;
        }
    }

    (score.min(1.0), criteria)
}

/// Generate ranked pairing proposals.
///
/// Hard constraints: the guardian is unassigned with a non-empty service
/// area; the tutor shares that exact area and has spare capacity; no
/// pending assignment or active relation links the pair already. Candidates
/// are ranked score-descending with ties broken by input order (first-seen
/// guardian, then first-seen tutor), then selected greedily — each guardian
/// and each tutor is consumed at most once per run.
pub fn propose_pairings(
    users: &[User],
    assignments: &[Assignment],
    relations: &[ApprovedRelation],
) -> Vec<MatchProposal> {
    let mut linked: HashSet<(&str, &str)> = HashSet::new();
    for assignment in assignments.iter().filter(|a| a.is_pending()) {
        linked.insert((assignment.guardian_id.as_str(), assignment.tutor_id.as_str()));
    }
    for relation in relations.iter().filter(|r| r.is_active()) {
        linked.insert((relation.guardian_id.as_str(), relation.tutor_id.as_str()));
    }

    let tutors: Vec<&Tutor> = users.iter().filter_map(User::as_tutor).collect();

    let mut candidates: Vec<MatchProposal> = Vec::new();
    for guardian in users.iter().filter_map(User::as_guardian) {
        if guardian.assigned_tutor.is_some() {
            continue;
        }
        let area = match guardian.service_area.as_deref() {
            Some(area) if !area.is_empty() => area,
            _ => continue,
        };

        for tutor in &tutors {
            if tutor.service_area.as_deref() != Some(area) {
                continue;
            }
            if !tutor.has_capacity() {
                continue;
            }
            if linked.contains(&(guardian.id.as_str(), tutor.id.as_str())) {
                continue;
            }

            let (score, criteria) = score_pair(guardian, tutor);
            candidates.push(MatchProposal {
                guardian_id: guardian.id.clone(),
                tutor_id: tutor.id.clone(),
                score,
                criteria,
            });
        }
    }

    // Stable sort keeps the guardian-major generation order for equal scores
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut used_guardians: HashSet<UserId> = HashSet::new();
    let mut used_tutors: HashSet<UserId> = HashSet::new();
    let mut selected = Vec::new();
    for candidate in candidates {
        if used_guardians.contains(&candidate.guardian_id)
            || used_tutors.contains(&candidate.tutor_id)
        {
            continue;
        }
        used_guardians.insert(candidate.guardian_id.clone());
        used_tutors.insert(candidate.tutor_id.clone());
        selected.push(candidate);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use copair_model::{AssignmentStatus, RelationStatus};
    use std::collections::BTreeSet;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn guardian(id: &str, area: Option<&str>, grade: Option<&str>, needs: &[&str]) -> User {
        User::Guardian(Guardian {
            id: id.to_string(),
            display_name: id.to_string(),
            email: format!("{id}@example.com"),
            service_area: area.map(str::to_string),
            grade_level: grade.map(str::to_string),
            needs: set(needs),
            assigned_tutor: None,
            created_at: Utc::now(),
        })
    }

    fn tutor(id: &str, area: Option<&str>, subjects: &[&str], grades: &[&str], max: usize) -> User {
        User::Tutor(Tutor {
            id: id.to_string(),
            display_name: id.to_string(),
            email: format!("{id}@example.com"),
            service_area: area.map(str::to_string),
            subjects: set(subjects),
            grade_levels: set(grades),
            assigned_learners: vec![],
            max_learners: max,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn test_base_score_without_bonuses() {
        let users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            tutor("t1", Some("Zone A"), &["math"], &["5"], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].score, BASE_SCORE);
        assert!(proposals[0].criteria.area_match);
        assert!(!proposals[0].criteria.subject_match);
        assert!(!proposals[0].criteria.grade_match);
    }

    #[test]
    fn test_score_bounds_and_bonus_criteria() {
        let users = vec![
            guardian("g1", Some("Zone A"), Some("5"), &["math", "physics"]),
            tutor("t1", Some("Zone A"), &["math"], &["5"], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        assert_eq!(proposals.len(), 1);
        let p = &proposals[0];
        // 0.75 + 0.15 * (1/2) + 0.10
        assert!((p.score - 0.925).abs() < 1e-9);
        assert!(p.criteria.subject_match);
        assert!(p.criteria.grade_match);
        assert!(p.score >= BASE_SCORE && p.score <= 1.0);
    }

    #[test]
    fn test_score_clamped_to_one() {
        let users = vec![
            guardian("g1", Some("Zone A"), Some("5"), &["math"]),
            tutor("t1", Some("Zone A"), &["math"], &["5"], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        // 0.75 + 0.15 + 0.10 == 1.0 exactly
        assert_eq!(proposals[0].score, 1.0);
    }

    #[test]
    fn test_area_mismatch_excludes_pair_entirely() {
        // Identical subjects and grade do not rescue a mismatched area
        let users = vec![
            guardian("g1", Some("Zone A"), Some("5"), &["math"]),
            tutor("t1", Some("Zone B"), &["math"], &["5"], 2),
        ];
        assert!(propose_pairings(&users, &[], &[]).is_empty());
    }

    #[test]
    fn test_missing_or_empty_area_excludes_guardian() {
        let users = vec![
            guardian("g1", None, None, &[]),
            guardian("g2", Some(""), None, &[]),
            tutor("t1", Some("Zone A"), &[], &[], 2),
        ];
        assert!(propose_pairings(&users, &[], &[]).is_empty());
    }

    #[test]
    fn test_assigned_guardian_not_proposed() {
        let mut users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            tutor("t1", Some("Zone A"), &[], &[], 2),
        ];
        if let User::Guardian(g) = &mut users[0] {
            g.assigned_tutor = Some("t9".to_string());
        }
        assert!(propose_pairings(&users, &[], &[]).is_empty());
    }

    #[test]
    fn test_tutor_at_capacity_excluded() {
        let mut users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            tutor("t1", Some("Zone A"), &[], &[], 1),
        ];
        if let User::Tutor(t) = &mut users[1] {
            t.assigned_learners.push("g9".to_string());
        }
        assert!(propose_pairings(&users, &[], &[]).is_empty());
    }

    #[test]
    fn test_one_pairing_per_entity_per_run() {
        // Two eligible guardians, one tutor with room for both: only the
        // first-ranked pair is proposed in a single run.
        let users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            guardian("g2", Some("Zone A"), None, &[]),
            tutor("t1", Some("Zone A"), &[], &[], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].guardian_id, "g1");
    }

    #[test]
    fn test_ranking_prefers_higher_score() {
        // g2 has a subject overlap with t1, so its pair outranks g1's
        let users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            guardian("g2", Some("Zone A"), None, &["math"]),
            tutor("t1", Some("Zone A"), &["math"], &[], 2),
            tutor("t2", Some("Zone A"), &[], &[], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].guardian_id, "g2");
        assert_eq!(proposals[0].tutor_id, "t1");
        assert_eq!(proposals[1].guardian_id, "g1");
        assert_eq!(proposals[1].tutor_id, "t2");
        assert!(proposals[0].score > proposals[1].score);
    }

    #[test]
    fn test_stable_tie_break_by_input_order() {
        let users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            tutor("t1", Some("Zone A"), &[], &[], 2),
            tutor("t2", Some("Zone A"), &[], &[], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        assert_eq!(proposals.len(), 1);
        // Equal scores: the first-seen tutor wins
        assert_eq!(proposals[0].tutor_id, "t1");
    }

    #[test]
    fn test_linked_pairs_excluded() {
        let users = vec![
            guardian("g1", Some("Zone A"), None, &[]),
            tutor("t1", Some("Zone A"), &[], &[], 2),
            tutor("t2", Some("Zone A"), &[], &[], 2),
        ];
        let pending = Assignment {
            id: "asg_1".to_string(),
            guardian_id: "g1".to_string(),
            tutor_id: "t1".to_string(),
            compatibility_score: BASE_SCORE,
            criteria: AssignmentCriteria {
                area_match: true,
                subject_match: false,
                grade_match: false,
            },
            created_by: "adm_1".to_string(),
            created_at: Utc::now(),
            status: AssignmentStatus::Pending,
        };
        let proposals = propose_pairings(&users, &[pending], &[]);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].tutor_id, "t2");

        let relation = ApprovedRelation {
            id: "rel_1".to_string(),
            guardian_id: "g1".to_string(),
            tutor_id: "t2".to_string(),
            approved_at: Utc::now(),
            approved_by: "adm_1".to_string(),
            compatibility_score: BASE_SCORE,
            criteria: AssignmentCriteria {
                area_match: true,
                subject_match: false,
                grade_match: false,
            },
            status: RelationStatus::Active,
            dissociated_at: None,
            dissociated_by: None,
        };
        let proposals = propose_pairings(&users, &[], &[relation]);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].tutor_id, "t1");
    }

    #[test]
    fn test_needs_without_overlap_scores_base() {
        let users = vec![
            guardian("g1", Some("Zone A"), None, &["chemistry"]),
            tutor("t1", Some("Zone A"), &["math"], &[], 2),
        ];
        let proposals = propose_pairings(&users, &[], &[]);
        assert_eq!(proposals[0].score, BASE_SCORE);
        assert!(!proposals[0].criteria.subject_match);
    }
}
