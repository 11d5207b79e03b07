//! User entities: tutors, guardians and administrators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque user identifier
pub type UserId = String;

/// User role discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Tutor,
    Guardian,
    Administrator,
}

/// A user offering instruction, bounded by a maximum learner capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutor {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub service_area: Option<String>,
    pub subjects: BTreeSet<String>,
    pub grade_levels: BTreeSet<String>,
    pub assigned_learners: Vec<UserId>,
    pub max_learners: usize,
    pub created_at: DateTime<Utc>,
}

impl Tutor {
    /// Whether the tutor can take on another learner
    pub fn has_capacity(&self) -> bool {
        self.assigned_learners.len() < self.max_learners
    }
}

/// A user seeking a tutor on behalf of a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guardian {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub service_area: Option<String>,
    pub grade_level: Option<String>,
    pub needs: BTreeSet<String>,
    pub assigned_tutor: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Administrative user, identity fields only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Administrator {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Closed union over all user roles.
///
/// Role is immutable after creation; stores reject updates that change the
/// variant of an existing user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum User {
    Tutor(Tutor),
    Guardian(Guardian),
    Administrator(Administrator),
}

impl User {
    pub fn id(&self) -> &str {
        match self {
            User::Tutor(t) => &t.id,
            User::Guardian(g) => &g.id,
            User::Administrator(a) => &a.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            User::Tutor(t) => &t.display_name,
            User::Guardian(g) => &g.display_name,
            User::Administrator(a) => &a.display_name,
        }
    }

    pub fn role(&self) -> UserRole {
        match self {
            User::Tutor(_) => UserRole::Tutor,
            User::Guardian(_) => UserRole::Guardian,
            User::Administrator(_) => UserRole::Administrator,
        }
    }

    pub fn service_area(&self) -> Option<&str> {
        match self {
            User::Tutor(t) => t.service_area.as_deref(),
            User::Guardian(g) => g.service_area.as_deref(),
            User::Administrator(_) => None,
        }
    }

    pub fn as_tutor(&self) -> Option<&Tutor> {
        match self {
            User::Tutor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_guardian(&self) -> Option<&Guardian> {
        match self {
            User::Guardian(g) => Some(g),
            _ => None,
        }
    }
}
