//! Role domain model.
//!
//! Two closed enumerations live here: the folder [`Role`] that every
//! resolution produces, and the [`DepartmentGrade`] a user holds inside
//! their department. [`DepartmentGrade::folder_role`] is the one mapping
//! table between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FolioError;

/// Effective role on a resource, ordered `None < Viewer < Editor < Admin`.
///
/// `None` means the resource is invisible to the user, not merely
/// read-only.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    None,
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    pub fn is_none(self) -> bool {
        self == Role::None
    }

    /// Whether this role satisfies a `required` minimum.
    pub fn at_least(self, required: Role) -> bool {
        self >= required
    }

    /// Roles that may be stored on an explicit share or a project roster.
    pub fn is_grantable(self) -> bool {
        self != Role::None
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Role::None),
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(FolioError::Validation {
                message: format!("unknown role: {other}"),
            }),
        }
    }
}

/// A user's grade inside their department.
///
/// Directory systems hand these out as loosely-cased strings
/// (`"MANAGER"`, `"admin"`, `"Editor"`); [`FromStr`] is the only place
/// they are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartmentGrade {
    Member,
    Editor,
    Manager,
}

impl DepartmentGrade {
    /// The folder role a grade confers on its department's resources.
    pub fn folder_role(self) -> Role {
        match self {
            DepartmentGrade::Manager => Role::Admin,
            DepartmentGrade::Editor => Role::Editor,
            DepartmentGrade::Member => Role::Viewer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DepartmentGrade::Member => "member",
            DepartmentGrade::Editor => "editor",
            DepartmentGrade::Manager => "manager",
        }
    }

    pub fn is_manager(self) -> bool {
        self == DepartmentGrade::Manager
    }
}

impl fmt::Display for DepartmentGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepartmentGrade {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manager" | "admin" => Ok(DepartmentGrade::Manager),
            "editor" => Ok(DepartmentGrade::Editor),
            "member" | "viewer" => Ok(DepartmentGrade::Member),
            other => Err(FolioError::Validation {
                message: format!("unknown department grade: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_totally_ordered() {
        assert!(Role::None < Role::Viewer);
        assert!(Role::Viewer < Role::Editor);
        assert!(Role::Editor < Role::Admin);
        assert_eq!(
            [Role::Editor, Role::Admin, Role::Viewer].into_iter().max(),
            Some(Role::Admin)
        );
    }

    #[test]
    fn grade_mapping_table() {
        assert_eq!(DepartmentGrade::Manager.folder_role(), Role::Admin);
        assert_eq!(DepartmentGrade::Editor.folder_role(), Role::Editor);
        assert_eq!(DepartmentGrade::Member.folder_role(), Role::Viewer);
    }

    #[test]
    fn grade_parsing_is_case_insensitive() {
        assert_eq!(
            "MANAGER".parse::<DepartmentGrade>().unwrap(),
            DepartmentGrade::Manager
        );
        assert_eq!(
            "admin".parse::<DepartmentGrade>().unwrap(),
            DepartmentGrade::Manager
        );
        assert_eq!(
            " Editor ".parse::<DepartmentGrade>().unwrap(),
            DepartmentGrade::Editor
        );
        assert_eq!(
            "viewer".parse::<DepartmentGrade>().unwrap(),
            DepartmentGrade::Member
        );
        assert!("owner".parse::<DepartmentGrade>().is_err());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::None, Role::Viewer, Role::Editor, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
        assert!(!Role::None.is_grantable());
    }
}
