//! The access service and the plumbing its operations share.

use folio_core::error::FolioResult;
use folio_core::models::grant::Lookup;
use folio_core::models::membership::Department;
use folio_core::models::resource::Resource;
use folio_core::repository::{GrantStore, MembershipProvider};
use tracing::debug;
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::context::UserContext;
use crate::department::DepartmentTree;
use crate::upstream::{Warnings, bounded};

/// Access-resolution service.
///
/// Generic over the grant store and membership provider so the engine has
/// no dependency on the database crate. The operations live in
/// [`resolver`](crate::resolver), [`visibility`](crate::visibility),
/// [`panorama`](crate::panorama), [`members`](crate::members) and
/// [`shares`](crate::shares).
pub struct AccessService<G: GrantStore, M: MembershipProvider> {
    pub(crate) store: G,
    pub(crate) directory: M,
    pub(crate) config: AccessConfig,
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    pub fn new(store: G, directory: M, config: AccessConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    pub fn store(&self) -> &G {
        &self.store
    }

    pub fn directory(&self) -> &M {
        &self.directory
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Fetch a resource. Failures propagate: without the resource there is
    /// nothing to evaluate.
    pub(crate) async fn fetch_resource(&self, id: Uuid) -> FolioResult<Resource> {
        bounded(
            self.config.upstream_timeout,
            Lookup::Resource,
            self.store.get_resource(id),
        )
        .await
    }

    /// Whether `user_id` holds the global super-admin flag. Unlike a
    /// resolution input, a failed lookup here is an error.
    pub async fn is_super_admin(&self, user_id: Uuid) -> FolioResult<bool> {
        bounded(
            self.config.upstream_timeout,
            Lookup::SuperAdmin,
            self.directory.is_super_admin(user_id),
        )
        .await
    }

    /// Load the user's memberships with one round of parallel lookups.
    pub(crate) async fn load_context(&self, user_id: Uuid) -> FolioResult<UserContext> {
        let limit = self.config.upstream_timeout;
        let (departments, projects, super_admin) = tokio::join!(
            bounded(
                limit,
                Lookup::DepartmentMemberships,
                self.directory.get_department_memberships(user_id),
            ),
            bounded(
                limit,
                Lookup::ProjectMemberships,
                self.directory.get_project_memberships(user_id),
            ),
            bounded(
                limit,
                Lookup::SuperAdmin,
                self.directory.is_super_admin(user_id)
            ),
        );

        let mut warnings = Warnings::default();
        let departments = warnings.absorb(Lookup::DepartmentMemberships, departments)?;
        let projects = warnings.absorb(Lookup::ProjectMemberships, projects)?;
        let super_admin = warnings.absorb(Lookup::SuperAdmin, super_admin)?;

        let mut context = UserContext {
            user_id,
            super_admin,
            departments,
            projects: projects
                .into_iter()
                .filter(|p| !p.role.is_none())
                .map(|p| (p.project_id, p.role))
                .collect(),
            tree: None,
            warnings: Vec::new(),
        };

        if context.is_manager() {
            context.tree = self.department_tree(&mut warnings).await?;
        }

        context.warnings = warnings.into_vec();
        debug!(
            user_id = %user_id,
            super_admin = context.super_admin,
            departments = context.departments.len(),
            projects = context.projects.len(),
            degraded = !context.warnings.is_empty(),
            "Loaded user context"
        );
        Ok(context)
    }

    /// The department forest, or `None` when the directory has none or
    /// could not answer.
    pub(crate) async fn department_tree(
        &self,
        warnings: &mut Warnings,
    ) -> FolioResult<Option<DepartmentTree>> {
        let listed = bounded(
            self.config.upstream_timeout,
            Lookup::DepartmentTree,
            self.directory.list_departments(),
        )
        .await;
        let departments: Vec<Department> = warnings.absorb(Lookup::DepartmentTree, listed)?;
        Ok((!departments.is_empty())
            .then(|| DepartmentTree::new(&departments, self.config.max_depth)))
    }
}
