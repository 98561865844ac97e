//! Resolution output model. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{DepartmentGrade, Role};

/// How the user's department relates to the resource's department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentRelation {
    /// The resource belongs to the user's own department.
    Own,
    /// The resource belongs to an ancestor of the user's department.
    ParentDepartment,
    /// The user manages an ancestor of the resource's department.
    ManagedSubdepartment,
}

/// Why a user holds a role on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantSource {
    Owner,
    ExplicitShare {
        share_id: Uuid,
    },
    Department {
        department_id: Uuid,
        grade: DepartmentGrade,
        relation: DepartmentRelation,
    },
    PublicZone {
        department_id: Uuid,
    },
    Project {
        project_id: Uuid,
    },
    SuperAdmin,
    PublicLibrary,
    SpaceRoot,
}

impl GrantSource {
    pub fn kind(&self) -> &'static str {
        match self {
            GrantSource::Owner => "owner",
            GrantSource::ExplicitShare { .. } => "explicit_share",
            GrantSource::Department { .. } => "department",
            GrantSource::PublicZone { .. } => "public_zone",
            GrantSource::Project { .. } => "project",
            GrantSource::SuperAdmin => "super_admin",
            GrantSource::PublicLibrary => "public_library",
            GrantSource::SpaceRoot => "space_root",
        }
    }

    /// Implicit sources are the ones a restricted resource suppresses.
    pub fn is_implicit(&self) -> bool {
        !matches!(
            self,
            GrantSource::Owner | GrantSource::ExplicitShare { .. } | GrantSource::SuperAdmin
        )
    }

    pub fn share_id(&self) -> Option<Uuid> {
        match self {
            GrantSource::ExplicitShare { share_id } => Some(*share_id),
            _ => None,
        }
    }
}

/// A role one source contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub role: Role,
    #[serde(flatten)]
    pub source: GrantSource,
}

/// An upstream call whose answer the evaluation had to do without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Resource,
    Children,
    ExplicitShare,
    UserShares,
    ResourceShares,
    OwnedResources,
    DepartmentResources,
    ProjectResources,
    SpaceResources,
    AllResources,
    DepartmentMemberships,
    ProjectMemberships,
    SuperAdmin,
    DepartmentTree,
    DepartmentMembers,
    ProjectMembers,
}

impl Lookup {
    pub fn as_str(self) -> &'static str {
        match self {
            Lookup::Resource => "resource",
            Lookup::Children => "children",
            Lookup::ExplicitShare => "explicit_share",
            Lookup::UserShares => "user_shares",
            Lookup::ResourceShares => "resource_shares",
            Lookup::OwnedResources => "owned_resources",
            Lookup::DepartmentResources => "department_resources",
            Lookup::ProjectResources => "project_resources",
            Lookup::SpaceResources => "space_resources",
            Lookup::AllResources => "all_resources",
            Lookup::DepartmentMemberships => "department_memberships",
            Lookup::ProjectMemberships => "project_memberships",
            Lookup::SuperAdmin => "super_admin",
            Lookup::DepartmentTree => "department_tree",
            Lookup::DepartmentMembers => "department_members",
            Lookup::ProjectMembers => "project_members",
        }
    }
}

/// Marks a result as evaluated without one of its inputs. The missing
/// source contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub lookup: Lookup,
    pub reason: String,
}

/// A resource left out of a bulk listing because its own lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Omission {
    pub resource_id: Uuid,
    pub reason: String,
}

/// Effective role of one user on one resource, with every source that
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResult {
    pub role: Role,
    pub sources: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Degradation>,
}

impl RoleResult {
    pub fn from_candidates(sources: Vec<Candidate>, warnings: Vec<Degradation>) -> Self {
        let role = sources
            .iter()
            .map(|c| c.role)
            .max()
            .unwrap_or(Role::None);
        Self {
            role,
            sources,
            warnings,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.role.is_none()
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn share_id(&self) -> Option<Uuid> {
        self.sources.iter().find_map(|c| c.source.share_id())
    }

    /// True when every source is department membership.
    pub fn only_department_sourced(&self) -> bool {
        !self.sources.is_empty()
            && self
                .sources
                .iter()
                .all(|c| matches!(c.source, GrantSource::Department { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_maximum_over_candidates() {
        let result = RoleResult::from_candidates(
            vec![
                Candidate {
                    role: Role::Viewer,
                    source: GrantSource::PublicLibrary,
                },
                Candidate {
                    role: Role::Editor,
                    source: GrantSource::ExplicitShare {
                        share_id: Uuid::nil(),
                    },
                },
            ],
            vec![],
        );
        assert_eq!(result.role, Role::Editor);
        assert_eq!(result.share_id(), Some(Uuid::nil()));
        assert!(!result.only_department_sourced());
    }

    #[test]
    fn no_candidates_means_none() {
        let result = RoleResult::from_candidates(vec![], vec![]);
        assert_eq!(result.role, Role::None);
        assert!(!result.is_visible());
    }

    #[test]
    fn candidate_serializes_flat() {
        let c = Candidate {
            role: Role::Viewer,
            source: GrantSource::Project {
                project_id: Uuid::nil(),
            },
        };
        let json = serde_json::to_value(c).unwrap();
        assert_eq!(json["kind"], "project");
        assert_eq!(json["role"], "viewer");
        assert_eq!(json["project_id"], Uuid::nil().to_string());
    }
}
