//! Per-request view of who the user is in the organisation.

use std::collections::HashMap;

use folio_core::models::grant::Degradation;
use folio_core::models::membership::DepartmentMembership;
use folio_core::models::role::{DepartmentGrade, Role};
use uuid::Uuid;

use crate::department::DepartmentTree;

/// Membership facts for one user, fetched once per operation and shared by
/// every resolution the operation performs.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: Uuid,
    pub super_admin: bool,
    /// Home department first, then its ancestors.
    pub departments: Vec<DepartmentMembership>,
    pub projects: HashMap<Uuid, Role>,
    /// Loaded only for managers, who need it to reach sub-departments.
    pub tree: Option<DepartmentTree>,
    /// Lookups the context had to do without.
    pub warnings: Vec<Degradation>,
}

impl UserContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn home_department(&self) -> Option<Uuid> {
        self.departments
            .iter()
            .find(|m| !m.inherited)
            .map(|m| m.department_id)
    }

    pub fn grade(&self) -> Option<DepartmentGrade> {
        self.departments.first().map(|m| m.grade)
    }

    pub fn is_manager(&self) -> bool {
        self.grade().is_some_and(DepartmentGrade::is_manager)
    }

    /// The membership record for `department_id`, when it is the home
    /// department or one of its ancestors.
    pub fn membership(&self, department_id: Uuid) -> Option<&DepartmentMembership> {
        self.departments
            .iter()
            .find(|m| m.department_id == department_id)
    }

    pub fn department_ids(&self) -> Vec<Uuid> {
        self.departments.iter().map(|m| m.department_id).collect()
    }

    /// Whether the user is a manager of `department_id` or of one of its
    /// ancestors.
    pub fn manages(&self, department_id: Uuid) -> bool {
        if !self.is_manager() {
            return false;
        }
        let Some(home) = self.home_department() else {
            return false;
        };
        if home == department_id {
            return true;
        }
        self.tree
            .as_ref()
            .is_some_and(|tree| tree.is_ancestor(home, department_id).unwrap_or(false))
    }

    /// Departments whose resources the user reaches through membership:
    /// the lineage, plus every sub-department for a manager.
    pub fn reachable_departments(&self) -> Vec<Uuid> {
        let mut ids = self.department_ids();
        if let (true, Some(home), Some(tree)) =
            (self.is_manager(), self.home_department(), self.tree.as_ref())
        {
            ids.extend(tree.descendants(home));
        }
        ids
    }
}
