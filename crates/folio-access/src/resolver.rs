//! Role resolution for one user on one resource.
//!
//! Every applicable source contributes a candidate and the effective role is
//! the maximum over all of them. Ownership, explicit shares and the
//! super-admin flag always apply; every other source is implicit and is
//! skipped entirely on a restricted resource. Explicit shares are looked up
//! for the resource itself only and never inherited from ancestors.

use folio_core::error::{FolioError, FolioResult};
use folio_core::models::grant::{Candidate, DepartmentRelation, GrantSource, Lookup, RoleResult};
use folio_core::models::resource::{Resource, SpaceType};
use folio_core::models::role::{DepartmentGrade, Role};
use folio_core::models::share::Share;
use folio_core::repository::{GrantStore, MembershipProvider};
use tracing::debug;
use uuid::Uuid;

use crate::cache::ResolutionCache;
use crate::context::UserContext;
use crate::service::AccessService;
use crate::upstream::{Warnings, bounded};

/// Every candidate role `ctx.user_id` holds on `resource`.
///
/// `share` is the explicit share for this exact `(resource, user)` pair, if
/// one exists; a share for any other pair is ignored.
pub fn candidates(resource: &Resource, ctx: &UserContext, share: Option<&Share>) -> Vec<Candidate> {
    let mut found = Vec::new();

    if resource.is_owned_by(ctx.user_id) {
        found.push(Candidate {
            role: Role::Admin,
            source: GrantSource::Owner,
        });
    }

    if let Some(share) =
        share.filter(|s| s.resource_id == resource.id && s.user_id == ctx.user_id)
    {
        found.push(Candidate {
            role: share.role,
            source: GrantSource::ExplicitShare { share_id: share.id },
        });
    }

    if ctx.super_admin {
        found.push(Candidate {
            role: Role::Admin,
            source: GrantSource::SuperAdmin,
        });
    }

    if resource.restricted {
        return found;
    }

    if let Some(department_id) = resource.department_id {
        found.extend(department_candidate(department_id, ctx));

        if resource.public_zone && ctx.membership(department_id).is_some() {
            found.push(Candidate {
                role: Role::Editor,
                source: GrantSource::PublicZone { department_id },
            });
        }
    }

    if let Some(project_id) = resource.project_id {
        if let Some(role) = ctx.projects.get(&project_id).copied() {
            found.push(Candidate {
                role,
                source: GrantSource::Project { project_id },
            });
        }
    }

    if resource.space == SpaceType::Public {
        found.push(Candidate {
            role: Role::Viewer,
            source: GrantSource::PublicLibrary,
        });
    } else if resource.is_space_root() {
        found.push(Candidate {
            role: Role::Viewer,
            source: GrantSource::SpaceRoot,
        });
    }

    found
}

/// The department source: the grade role when the resource's department is
/// the user's own or an ancestor of it, admin when the user manages an
/// ancestor of the resource's department, nothing otherwise.
fn department_candidate(department_id: Uuid, ctx: &UserContext) -> Option<Candidate> {
    if let Some(membership) = ctx.membership(department_id) {
        let relation = if membership.inherited {
            DepartmentRelation::ParentDepartment
        } else {
            DepartmentRelation::Own
        };
        return Some(Candidate {
            role: membership.grade.folder_role(),
            source: GrantSource::Department {
                department_id,
                grade: membership.grade,
                relation,
            },
        });
    }

    ctx.manages(department_id).then_some(Candidate {
        role: DepartmentGrade::Manager.folder_role(),
        source: GrantSource::Department {
            department_id,
            grade: DepartmentGrade::Manager,
            relation: DepartmentRelation::ManagedSubdepartment,
        },
    })
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    /// Effective role of `user_id` on `resource_id`, with every source that
    /// produced it.
    ///
    /// Fails only when the resource itself cannot be fetched. Membership or
    /// share lookups that fail are reported as warnings on the result and
    /// contribute nothing.
    pub async fn resolve(&self, resource_id: Uuid, user_id: Uuid) -> FolioResult<RoleResult> {
        let resource = self.fetch_resource(resource_id).await?;
        self.resolve_resource(&resource, user_id).await
    }

    /// Like [`resolve`](Self::resolve) for a resource already in hand.
    pub async fn resolve_resource(
        &self,
        resource: &Resource,
        user_id: Uuid,
    ) -> FolioResult<RoleResult> {
        let ctx = self.load_context(user_id).await?;
        let mut result = self.grant(resource, &ctx, None).await?;

        let mut warnings = ctx.warnings;
        warnings.append(&mut result.warnings);
        result.warnings = warnings;
        Ok(result)
    }

    /// Resolve `caller` on `resource_id` and fail with `Forbidden` below
    /// `required`.
    pub async fn authorize(
        &self,
        caller: Uuid,
        resource_id: Uuid,
        required: Role,
    ) -> FolioResult<RoleResult> {
        let result = self.resolve(resource_id, caller).await?;
        if result.is_visible() && result.role.at_least(required) {
            return Ok(result);
        }
        Err(FolioError::forbidden(format!(
            "user {caller} needs {required} on resource {resource_id}, has {}",
            result.role
        )))
    }

    /// Evaluate `resource` against an already loaded context. The result's
    /// warnings cover only the lookups made here, not the context's own.
    pub(crate) async fn grant(
        &self,
        resource: &Resource,
        ctx: &UserContext,
        cache: Option<&ResolutionCache>,
    ) -> FolioResult<RoleResult> {
        if let Some(hit) = cache.and_then(|c| c.get(resource, ctx.user_id)) {
            return Ok(hit);
        }

        let mut warnings = Warnings::default();
        let share = bounded(
            self.config.upstream_timeout,
            Lookup::ExplicitShare,
            self.store.get_explicit_share(resource.id, ctx.user_id),
        )
        .await;
        let share = warnings.absorb(Lookup::ExplicitShare, share)?;

        let result = RoleResult::from_candidates(
            candidates(resource, ctx, share.as_ref()),
            warnings.into_vec(),
        );

        debug!(
            resource_id = %resource.id,
            user_id = %ctx.user_id,
            role = %result.role,
            sources = result.sources.len(),
            "Resolved role"
        );

        if let Some(cache) = cache {
            cache.insert(resource, ctx.user_id, &result);
        }
        Ok(result)
    }
}
