//! SurrealDB implementation of [`MembershipProvider`].
//!
//! The directory tables are owned by whatever syncs the organisation chart;
//! the write helpers on [`SurrealMembershipProvider`] exist for that sync
//! and for seeding test fixtures. The resolution engine only reads.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use folio_core::error::{FolioError, FolioResult};
use folio_core::models::membership::{
    Department, DepartmentMember, DepartmentMembership, ProjectMember, ProjectMembership,
};
use folio_core::models::role::{DepartmentGrade, Role};
use folio_core::repository::MembershipProvider;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// Maximum number of ancestors followed from a home department.
const MAX_DEPARTMENT_DEPTH: usize = 64;

#[derive(Debug, SurrealValue)]
struct DepartmentRow {
    record_id: String,
    name: String,
    parent_id: Option<String>,
}

impl DepartmentRow {
    fn try_into_department(self) -> Result<Department, DbError> {
        Ok(Department {
            id: parse_uuid("department", &self.record_id)?,
            name: self.name,
            parent_id: parse_opt_uuid("parent department", self.parent_id)?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct DirectoryUserRow {
    record_id: String,
    department_id: Option<String>,
    grade: String,
    super_admin: bool,
}

#[derive(Debug, SurrealValue)]
struct ProjectMemberRow {
    project_id: String,
    user_id: String,
    role: String,
}

fn parse_with<T: FromStr<Err = FolioError>>(raw: &str) -> Result<T, DbError> {
    raw.parse().map_err(|e: FolioError| DbError::Decode(e.to_string()))
}

fn project_member_key(project_id: Uuid, user_id: Uuid) -> String {
    format!("{project_id}_{user_id}")
}

/// SurrealDB-backed organisation directory and project rosters.
#[derive(Clone)]
pub struct SurrealMembershipProvider<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipProvider<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    pub async fn create_department(
        &self,
        name: impl Into<String>,
        parent_id: Option<Uuid>,
    ) -> FolioResult<Department> {
        let id = Uuid::new_v4();
        let name: String = name.into();

        self.db
            .query(
                "CREATE type::record('department', $id) SET \
                 name = $name, parent_id = $parent_id",
            )
            .bind(("id", id.to_string()))
            .bind(("name", name))
            .bind(("parent_id", parent_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let departments = self.list_departments().await?;
        departments
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| FolioError::not_found("department", id))
    }

    /// Place a user in a home department with a grade. `None` detaches the
    /// user from every department.
    pub async fn assign_user(
        &self,
        user_id: Uuid,
        department_id: Option<Uuid>,
        grade: DepartmentGrade,
    ) -> FolioResult<()> {
        self.db
            .query(
                "UPSERT type::record('directory_user', $id) SET \
                 department_id = $department_id, grade = $grade",
            )
            .bind(("id", user_id.to_string()))
            .bind(("department_id", department_id.map(|d| d.to_string())))
            .bind(("grade", grade.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn set_super_admin(&self, user_id: Uuid, super_admin: bool) -> FolioResult<()> {
        self.db
            .query("UPSERT type::record('directory_user', $id) SET super_admin = $super_admin")
            .bind(("id", user_id.to_string()))
            .bind(("super_admin", super_admin))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn add_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> FolioResult<()> {
        self.db
            .query(
                "UPSERT type::record('project_member', $id) SET \
                 project_id = $project_id, user_id = $user_id, role = $role",
            )
            .bind(("id", project_member_key(project_id, user_id)))
            .bind(("project_id", project_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role", role.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        Ok(())
    }

    pub async fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> FolioResult<()> {
        self.db
            .query("DELETE type::record('project_member', $id)")
            .bind(("id", project_member_key(project_id, user_id)))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn directory_user(&self, user_id: Uuid) -> FolioResult<Option<DirectoryUserRow>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('directory_user', $id)",
            )
            .bind(("id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DirectoryUserRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next())
    }
}

/// Walk from `home` to the top of the forest, nearest first.
fn lineage(home: Uuid, departments: &[Department]) -> Result<Vec<Uuid>, DbError> {
    let parents: HashMap<Uuid, Option<Uuid>> =
        departments.iter().map(|d| (d.id, d.parent_id)).collect();

    let mut chain = vec![home];
    let mut seen = HashSet::from([home]);
    let mut current = home;
    while let Some(Some(parent)) = parents.get(&current) {
        if !seen.insert(*parent) || chain.len() >= MAX_DEPARTMENT_DEPTH {
            return Err(DbError::CyclicDepartments(parent.to_string()));
        }
        chain.push(*parent);
        current = *parent;
    }
    Ok(chain)
}

impl<C: Connection> MembershipProvider for SurrealMembershipProvider<C> {
    async fn get_department_memberships(
        &self,
        user_id: Uuid,
    ) -> FolioResult<Vec<DepartmentMembership>> {
        let Some(row) = self.directory_user(user_id).await? else {
            return Ok(Vec::new());
        };
        let Some(home) = parse_opt_uuid("department", row.department_id)? else {
            return Ok(Vec::new());
        };
        let grade: DepartmentGrade = parse_with(&row.grade)?;

        let departments = self.list_departments().await?;
        let chain = lineage(home, &departments)?;

        Ok(chain
            .into_iter()
            .enumerate()
            .map(|(depth, department_id)| DepartmentMembership {
                department_id,
                grade,
                inherited: depth > 0,
            })
            .collect())
    }

    async fn get_project_memberships(&self, user_id: Uuid) -> FolioResult<Vec<ProjectMembership>> {
        let mut result = self
            .db
            .query("SELECT * FROM project_member WHERE user_id = $user_id ORDER BY project_id ASC")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectMemberRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(ProjectMembership {
                    project_id: parse_uuid("project", &row.project_id)?,
                    role: parse_with(&row.role)?,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn is_super_admin(&self, user_id: Uuid) -> FolioResult<bool> {
        Ok(self
            .directory_user(user_id)
            .await?
            .is_some_and(|row| row.super_admin))
    }

    async fn list_departments(&self) -> FolioResult<Vec<Department>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM department ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(DepartmentRow::try_into_department)
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn list_department_members(
        &self,
        department_id: Uuid,
    ) -> FolioResult<Vec<DepartmentMember>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM directory_user \
                 WHERE department_id = $department_id",
            )
            .bind(("department_id", department_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DirectoryUserRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(DepartmentMember {
                    user_id: parse_uuid("user", &row.record_id)?,
                    grade: parse_with(&row.grade)?,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn list_project_members(&self, project_id: Uuid) -> FolioResult<Vec<ProjectMember>> {
        let mut result = self
            .db
            .query("SELECT * FROM project_member WHERE project_id = $project_id")
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectMemberRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(ProjectMember {
                    user_id: parse_uuid("user", &row.user_id)?,
                    role: parse_with(&row.role)?,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(id: Uuid, parent_id: Option<Uuid>) -> Department {
        Department {
            id,
            name: id.to_string(),
            parent_id,
        }
    }

    #[test]
    fn lineage_is_nearest_first() {
        let (root, mid, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let departments = vec![dept(root, None), dept(mid, Some(root)), dept(leaf, Some(mid))];
        assert_eq!(lineage(leaf, &departments).unwrap(), vec![leaf, mid, root]);
    }

    #[test]
    fn lineage_rejects_cycles() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let departments = vec![dept(a, Some(b)), dept(b, Some(a))];
        assert!(matches!(
            lineage(a, &departments),
            Err(DbError::CyclicDepartments(_))
        ));
    }

    #[test]
    fn lineage_stops_at_unknown_parent() {
        let (a, ghost) = (Uuid::new_v4(), Uuid::new_v4());
        let departments = vec![dept(a, Some(ghost))];
        assert_eq!(lineage(a, &departments).unwrap(), vec![a, ghost]);
    }
}
