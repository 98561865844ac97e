//! Data-access traits for the resolution engine.
//!
//! All operations are async. Neither trait carries policy: the engine
//! never asks a store or provider whether a user may do something, only
//! what the recorded facts are.

use uuid::Uuid;

use crate::error::FolioResult;
use crate::models::{
    membership::{
        Department, DepartmentMember, DepartmentMembership, ProjectMember, ProjectMembership,
    },
    resource::{CreateResource, Resource, SpaceType, UpdateResource},
    role::Role,
    share::Share,
};

// ---------------------------------------------------------------------------
// Grant store: resource metadata and explicit shares
// ---------------------------------------------------------------------------

pub trait GrantStore: Send + Sync {
    fn get_resource(&self, id: Uuid) -> impl Future<Output = FolioResult<Resource>> + Send;

    /// Fetch many resources at once. Unknown ids are skipped.
    fn get_resources(
        &self,
        ids: Vec<Uuid>,
    ) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn create_resource(
        &self,
        input: CreateResource,
    ) -> impl Future<Output = FolioResult<Resource>> + Send;

    /// Apply an update and bump the resource's revision.
    fn update_resource(
        &self,
        id: Uuid,
        input: UpdateResource,
    ) -> impl Future<Output = FolioResult<Resource>> + Send;

    /// Direct children of a resource.
    fn list_children(
        &self,
        parent_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    /// Resources without a parent.
    fn list_space_roots(&self) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn list_resources_owned_by(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn list_resources_in_departments(
        &self,
        department_ids: Vec<Uuid>,
    ) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn list_resources_in_projects(
        &self,
        project_ids: Vec<Uuid>,
    ) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn list_resources_in_space(
        &self,
        space: SpaceType,
    ) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn list_all_resources(&self) -> impl Future<Output = FolioResult<Vec<Resource>>> + Send;

    fn get_explicit_share(
        &self,
        resource_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = FolioResult<Option<Share>>> + Send;

    fn get_share(&self, share_id: Uuid) -> impl Future<Output = FolioResult<Share>> + Send;

    /// Create the share for `(resource_id, user_id)` or replace its role.
    /// Atomic per pair: concurrent calls never produce two rows.
    fn upsert_share(
        &self,
        resource_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> impl Future<Output = FolioResult<Share>> + Send;

    /// Hard delete. Fails with `NotFound` when the share does not exist.
    fn delete_share(&self, share_id: Uuid) -> impl Future<Output = FolioResult<()>> + Send;

    fn list_shares_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<Share>>> + Send;

    fn list_shares_for_resource(
        &self,
        resource_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<Share>>> + Send;
}

// ---------------------------------------------------------------------------
// Membership provider: the org directory and project rosters (read-only)
// ---------------------------------------------------------------------------

pub trait MembershipProvider: Send + Sync {
    /// The user's home department followed by its ancestors, nearest
    /// first, all carrying the user's grade. Empty when the user has no
    /// department.
    fn get_department_memberships(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<DepartmentMembership>>> + Send;

    fn get_project_memberships(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<ProjectMembership>>> + Send;

    fn is_super_admin(&self, user_id: Uuid) -> impl Future<Output = FolioResult<bool>> + Send;

    /// The whole department forest.
    fn list_departments(&self) -> impl Future<Output = FolioResult<Vec<Department>>> + Send;

    /// Users whose home department is `department_id`.
    fn list_department_members(
        &self,
        department_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<DepartmentMember>>> + Send;

    fn list_project_members(
        &self,
        project_id: Uuid,
    ) -> impl Future<Output = FolioResult<Vec<ProjectMember>>> + Send;
}
