//! Department and project membership as seen by the resolution engine.
//!
//! The directory that owns these records mutates them on its own schedule;
//! the engine only reads them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{DepartmentGrade, Role};

/// A node of the department forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// One department a user counts as a member of.
///
/// A user belongs to a single department but is a member of that department
/// and every ancestor; `inherited` is `false` only for the home department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentMembership {
    pub department_id: Uuid,
    pub grade: DepartmentGrade,
    pub inherited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub project_id: Uuid,
    pub role: Role,
}

/// A user whose home department is the queried department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentMember {
    pub user_id: Uuid,
    pub grade: DepartmentGrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub role: Role,
}
