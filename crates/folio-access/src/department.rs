//! In-memory view of the department forest.

use std::collections::{HashMap, HashSet, VecDeque};

use folio_core::models::membership::Department;
use uuid::Uuid;

use crate::error::AccessError;

/// Parent and child links of every department, so ancestry questions are
/// answered without a provider call per hop.
#[derive(Debug, Clone, Default)]
pub struct DepartmentTree {
    parents: HashMap<Uuid, Option<Uuid>>,
    children: HashMap<Uuid, Vec<Uuid>>,
    max_depth: usize,
}

impl DepartmentTree {
    pub fn new(departments: &[Department], max_depth: usize) -> Self {
        let mut parents = HashMap::with_capacity(departments.len());
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for department in departments {
            parents.insert(department.id, department.parent_id);
            if let Some(parent) = department.parent_id {
                children.entry(parent).or_default().push(department.id);
            }
        }
        Self {
            parents,
            children,
            max_depth,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.parents.contains_key(&id)
    }

    /// `id` followed by its ancestors, nearest first.
    pub fn lineage(&self, id: Uuid) -> Result<Vec<Uuid>, AccessError> {
        let mut chain = vec![id];
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(Some(parent)) = self.parents.get(&current) {
            if !seen.insert(*parent) || chain.len() > self.max_depth {
                return Err(AccessError::DepartmentCycle {
                    department_id: *parent,
                });
            }
            chain.push(*parent);
            current = *parent;
        }
        Ok(chain)
    }

    /// Whether `ancestor` is a strict ancestor of `department`.
    pub fn is_ancestor(&self, ancestor: Uuid, department: Uuid) -> Result<bool, AccessError> {
        Ok(ancestor != department && self.lineage(department)?.contains(&ancestor))
    }

    /// Every strict descendant of `id`, breadth first.
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.children.get(&current).into_iter().flatten() {
                if seen.insert(*child) {
                    found.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        found
    }
}
