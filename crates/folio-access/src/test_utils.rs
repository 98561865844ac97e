//! In-memory collaborators with injectable latency and failures.
//!
//! Both fakes are cheap to clone and share their state, so a test can keep
//! one handle for seeding and fault injection while the service owns
//! another.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use folio_core::error::{FolioError, FolioResult};
use folio_core::models::membership::{
    Department, DepartmentMember, DepartmentMembership, ProjectMember, ProjectMembership,
};
use folio_core::models::resource::{CreateResource, Resource, SpaceType, UpdateResource};
use folio_core::models::role::{DepartmentGrade, Role};
use folio_core::models::share::Share;
use folio_core::repository::{GrantStore, MembershipProvider};
use uuid::Uuid;

use crate::{AccessConfig, AccessService};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Faults {
    delays: HashMap<&'static str, Duration>,
    unavailable: HashSet<&'static str>,
    broken: HashSet<Uuid>,
}

/// Faults applied to the operations of one fake, by operation name
/// (`"get_explicit_share"`, `"list_children"`, ...).
#[derive(Clone, Default)]
pub struct FaultPlan(Arc<Mutex<Faults>>);

impl FaultPlan {
    pub fn delay(&self, op: &'static str, by: Duration) {
        lock(&self.0).delays.insert(op, by);
    }

    /// Make `op` fail with `UpstreamUnavailable`.
    pub fn make_unavailable(&self, op: &'static str) {
        lock(&self.0).unavailable.insert(op);
    }

    /// Make every lookup that names `id` fail with an internal error.
    pub fn break_id(&self, id: Uuid) {
        lock(&self.0).broken.insert(id);
    }

    pub fn clear(&self) {
        *lock(&self.0) = Faults::default();
    }

    async fn enter(&self, op: &'static str, ids: &[Uuid]) -> FolioResult<()> {
        let (delay, unavailable, broken) = {
            let faults = lock(&self.0);
            (
                faults.delays.get(op).copied(),
                faults.unavailable.contains(op),
                ids.iter().find(|id| faults.broken.contains(id)).copied(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unavailable {
            return Err(FolioError::upstream(op));
        }
        if let Some(id) = broken {
            return Err(FolioError::Internal(format!("{op} failed for {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Grant store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    resources: HashMap<Uuid, Resource>,
    shares: HashMap<Uuid, Share>,
}

#[derive(Clone, Default)]
pub struct InMemoryGrantStore {
    state: Arc<Mutex<StoreState>>,
    pub faults: FaultPlan,
}

fn sorted(mut resources: Vec<Resource>) -> Vec<Resource> {
    resources.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    resources
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource synchronously, bypassing fault injection.
    pub fn seed(&self, input: CreateResource) -> Resource {
        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4(),
            name: input.name,
            kind: input.kind,
            parent_id: input.parent_id,
            space: input.space,
            owner_id: input.owner_id,
            restricted: input.restricted,
            public_zone: input.public_zone,
            department_id: input.department_id,
            project_id: input.project_id,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        self.insert_raw(resource.clone());
        resource
    }

    /// Store a resource exactly as given, malformed or not.
    pub fn insert_raw(&self, resource: Resource) {
        lock(&self.state).resources.insert(resource.id, resource);
    }

    pub fn share_count(&self) -> usize {
        lock(&self.state).shares.len()
    }

    fn filtered(&self, keep: impl Fn(&Resource) -> bool) -> Vec<Resource> {
        sorted(
            lock(&self.state)
                .resources
                .values()
                .filter(|r| keep(r))
                .cloned()
                .collect(),
        )
    }
}

impl GrantStore for InMemoryGrantStore {
    async fn get_resource(&self, id: Uuid) -> FolioResult<Resource> {
        self.faults.enter("get_resource", &[id]).await?;
        lock(&self.state)
            .resources
            .get(&id)
            .cloned()
            .ok_or_else(|| FolioError::not_found("resource", id))
    }

    async fn get_resources(&self, ids: Vec<Uuid>) -> FolioResult<Vec<Resource>> {
        self.faults.enter("get_resources", &ids).await?;
        let state = lock(&self.state);
        Ok(sorted(
            ids.iter()
                .filter_map(|id| state.resources.get(id).cloned())
                .collect(),
        ))
    }

    async fn create_resource(&self, input: CreateResource) -> FolioResult<Resource> {
        self.faults.enter("create_resource", &[]).await?;
        Ok(self.seed(input))
    }

    async fn update_resource(&self, id: Uuid, input: UpdateResource) -> FolioResult<Resource> {
        self.faults.enter("update_resource", &[id]).await?;
        let mut state = lock(&self.state);
        let resource = state
            .resources
            .get_mut(&id)
            .ok_or_else(|| FolioError::not_found("resource", id))?;
        if let Some(name) = input.name {
            resource.name = name;
        }
        if let Some(owner_id) = input.owner_id {
            resource.owner_id = owner_id;
        }
        if let Some(restricted) = input.restricted {
            resource.restricted = restricted;
        }
        if let Some(public_zone) = input.public_zone {
            resource.public_zone = public_zone;
        }
        if let Some(department_id) = input.department_id {
            resource.department_id = department_id;
        }
        if let Some(project_id) = input.project_id {
            resource.project_id = project_id;
        }
        resource.revision += 1;
        resource.updated_at = Utc::now();
        Ok(resource.clone())
    }

    async fn list_children(&self, parent_id: Uuid) -> FolioResult<Vec<Resource>> {
        self.faults.enter("list_children", &[parent_id]).await?;
        Ok(self.filtered(|r| r.parent_id == Some(parent_id)))
    }

    async fn list_space_roots(&self) -> FolioResult<Vec<Resource>> {
        self.faults.enter("list_space_roots", &[]).await?;
        Ok(self.filtered(|r| r.parent_id.is_none()))
    }

    async fn list_resources_owned_by(&self, user_id: Uuid) -> FolioResult<Vec<Resource>> {
        self.faults.enter("list_resources_owned_by", &[user_id]).await?;
        Ok(self.filtered(|r| r.owner_id == Some(user_id)))
    }

    async fn list_resources_in_departments(
        &self,
        department_ids: Vec<Uuid>,
    ) -> FolioResult<Vec<Resource>> {
        self.faults
            .enter("list_resources_in_departments", &department_ids)
            .await?;
        Ok(self.filtered(|r| r.department_id.is_some_and(|d| department_ids.contains(&d))))
    }

    async fn list_resources_in_projects(&self, project_ids: Vec<Uuid>) -> FolioResult<Vec<Resource>> {
        self.faults
            .enter("list_resources_in_projects", &project_ids)
            .await?;
        Ok(self.filtered(|r| r.project_id.is_some_and(|p| project_ids.contains(&p))))
    }

    async fn list_resources_in_space(&self, space: SpaceType) -> FolioResult<Vec<Resource>> {
        self.faults.enter("list_resources_in_space", &[]).await?;
        Ok(self.filtered(|r| r.space == space))
    }

    async fn list_all_resources(&self) -> FolioResult<Vec<Resource>> {
        self.faults.enter("list_all_resources", &[]).await?;
        Ok(self.filtered(|_| true))
    }

    async fn get_explicit_share(
        &self,
        resource_id: Uuid,
        user_id: Uuid,
    ) -> FolioResult<Option<Share>> {
        self.faults
            .enter("get_explicit_share", &[resource_id, user_id])
            .await?;
        Ok(lock(&self.state)
            .shares
            .get(&Share::key(resource_id, user_id))
            .cloned())
    }

    async fn get_share(&self, share_id: Uuid) -> FolioResult<Share> {
        self.faults.enter("get_share", &[share_id]).await?;
        lock(&self.state)
            .shares
            .get(&share_id)
            .cloned()
            .ok_or_else(|| FolioError::not_found("share", share_id))
    }

    async fn upsert_share(&self, resource_id: Uuid, user_id: Uuid, role: Role) -> FolioResult<Share> {
        self.faults
            .enter("upsert_share", &[resource_id, user_id])
            .await?;
        if !role.is_grantable() {
            return Err(FolioError::Validation {
                message: format!("role '{role}' cannot be stored on a share"),
            });
        }
        let id = Share::key(resource_id, user_id);
        let now = Utc::now();
        let mut state = lock(&self.state);
        let share = state.shares.entry(id).or_insert_with(|| Share {
            id,
            resource_id,
            user_id,
            role,
            created_at: now,
            updated_at: now,
        });
        share.role = role;
        share.updated_at = now;
        Ok(share.clone())
    }

    async fn delete_share(&self, share_id: Uuid) -> FolioResult<()> {
        self.faults.enter("delete_share", &[share_id]).await?;
        lock(&self.state)
            .shares
            .remove(&share_id)
            .map(|_| ())
            .ok_or_else(|| FolioError::not_found("share", share_id))
    }

    async fn list_shares_for_user(&self, user_id: Uuid) -> FolioResult<Vec<Share>> {
        self.faults.enter("list_shares_for_user", &[user_id]).await?;
        let mut shares: Vec<Share> = lock(&self.state)
            .shares
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        shares.sort_by_key(|s| s.id);
        Ok(shares)
    }

    async fn list_shares_for_resource(&self, resource_id: Uuid) -> FolioResult<Vec<Share>> {
        self.faults
            .enter("list_shares_for_resource", &[resource_id])
            .await?;
        let mut shares: Vec<Share> = lock(&self.state)
            .shares
            .values()
            .filter(|s| s.resource_id == resource_id)
            .cloned()
            .collect();
        shares.sort_by_key(|s| s.id);
        Ok(shares)
    }
}

// ---------------------------------------------------------------------------
// Membership provider
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DirectoryState {
    departments: HashMap<Uuid, Department>,
    users: HashMap<Uuid, (Uuid, DepartmentGrade)>,
    super_admins: HashSet<Uuid>,
    projects: HashMap<(Uuid, Uuid), Role>,
}

#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
    pub faults: FaultPlan,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_department(&self, name: &str, parent_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.state).departments.insert(
            id,
            Department {
                id,
                name: name.into(),
                parent_id,
            },
        );
        id
    }

    pub fn assign(&self, user_id: Uuid, department_id: Uuid, grade: DepartmentGrade) {
        lock(&self.state)
            .users
            .insert(user_id, (department_id, grade));
    }

    pub fn set_super_admin(&self, user_id: Uuid) {
        lock(&self.state).super_admins.insert(user_id);
    }

    pub fn add_project_member(&self, project_id: Uuid, user_id: Uuid, role: Role) {
        lock(&self.state)
            .projects
            .insert((project_id, user_id), role);
    }
}

impl MembershipProvider for InMemoryDirectory {
    async fn get_department_memberships(
        &self,
        user_id: Uuid,
    ) -> FolioResult<Vec<DepartmentMembership>> {
        self.faults
            .enter("get_department_memberships", &[user_id])
            .await?;
        let state = lock(&self.state);
        let Some((home, grade)) = state.users.get(&user_id).copied() else {
            return Ok(Vec::new());
        };

        let mut memberships = vec![DepartmentMembership {
            department_id: home,
            grade,
            inherited: false,
        }];
        let mut current = state.departments.get(&home).and_then(|d| d.parent_id);
        while let Some(id) = current {
            if memberships.iter().any(|m| m.department_id == id) {
                return Err(FolioError::InvariantViolation(format!(
                    "department hierarchy is cyclic at {id}"
                )));
            }
            memberships.push(DepartmentMembership {
                department_id: id,
                grade,
                inherited: true,
            });
            current = state.departments.get(&id).and_then(|d| d.parent_id);
        }
        Ok(memberships)
    }

    async fn get_project_memberships(&self, user_id: Uuid) -> FolioResult<Vec<ProjectMembership>> {
        self.faults
            .enter("get_project_memberships", &[user_id])
            .await?;
        let mut memberships: Vec<ProjectMembership> = lock(&self.state)
            .projects
            .iter()
            .filter(|((_, user), _)| *user == user_id)
            .map(|((project_id, _), role)| ProjectMembership {
                project_id: *project_id,
                role: *role,
            })
            .collect();
        memberships.sort_by_key(|m| m.project_id);
        Ok(memberships)
    }

    async fn is_super_admin(&self, user_id: Uuid) -> FolioResult<bool> {
        self.faults.enter("is_super_admin", &[user_id]).await?;
        Ok(lock(&self.state).super_admins.contains(&user_id))
    }

    async fn list_departments(&self) -> FolioResult<Vec<Department>> {
        self.faults.enter("list_departments", &[]).await?;
        let mut departments: Vec<Department> =
            lock(&self.state).departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn list_department_members(
        &self,
        department_id: Uuid,
    ) -> FolioResult<Vec<DepartmentMember>> {
        self.faults
            .enter("list_department_members", &[department_id])
            .await?;
        let mut members: Vec<DepartmentMember> = lock(&self.state)
            .users
            .iter()
            .filter(|(_, (home, _))| *home == department_id)
            .map(|(user_id, (_, grade))| DepartmentMember {
                user_id: *user_id,
                grade: *grade,
            })
            .collect();
        members.sort_by_key(|m| m.user_id);
        Ok(members)
    }

    async fn list_project_members(&self, project_id: Uuid) -> FolioResult<Vec<ProjectMember>> {
        self.faults
            .enter("list_project_members", &[project_id])
            .await?;
        let mut members: Vec<ProjectMember> = lock(&self.state)
            .projects
            .iter()
            .filter(|((project, _), _)| *project == project_id)
            .map(|((_, user_id), role)| ProjectMember {
                user_id: *user_id,
                role: *role,
            })
            .collect();
        members.sort_by_key(|m| m.user_id);
        Ok(members)
    }
}

/// A service over fresh fakes with a short upstream timeout, plus handles
/// to both fakes.
pub fn fixture() -> (
    AccessService<InMemoryGrantStore, InMemoryDirectory>,
    InMemoryGrantStore,
    InMemoryDirectory,
) {
    let store = InMemoryGrantStore::new();
    let directory = InMemoryDirectory::new();
    let config = AccessConfig {
        upstream_timeout: Duration::from_millis(200),
        ..AccessConfig::default()
    };
    (
        AccessService::new(store.clone(), directory.clone(), config),
        store,
        directory,
    )
}
