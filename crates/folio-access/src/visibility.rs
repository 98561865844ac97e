//! Folder listings filtered to what the user may see.

use std::collections::{HashMap, HashSet};

use folio_core::error::{FolioError, FolioResult};
use folio_core::models::grant::{Degradation, Lookup, Omission, RoleResult};
use folio_core::models::resource::Resource;
use folio_core::models::role::Role;
use folio_core::repository::{GrantStore, MembershipProvider};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::ResolutionCache;
use crate::context::UserContext;
use crate::error::AccessError;
use crate::service::AccessService;
use crate::upstream::{Warnings, bounded};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleChild {
    pub resource: Resource,
    pub grant: RoleResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleChildren {
    pub parent_id: Uuid,
    pub parent_grant: RoleResult,
    /// In the order the store listed them.
    pub children: Vec<VisibleChild>,
    /// Whether the department isolation allow-list was applied.
    pub isolated: bool,
    pub omitted: Vec<Omission>,
    pub warnings: Vec<Degradation>,
}

/// The user's lineage, which a viewer-grade member may browse into, or
/// `None` when the listing is not isolated. The caller adds the home
/// department's subtree.
///
/// Isolation applies when the parent grants viewer through department
/// membership alone and the user does not manage the parent's department.
fn isolation_allow_list(
    parent: &Resource,
    grant: &RoleResult,
    ctx: &UserContext,
) -> Option<HashSet<Uuid>> {
    let governed = parent.department_id?;
    if grant.role != Role::Viewer
        || !grant.only_department_sourced()
        || ctx.super_admin
        || ctx.manages(governed)
    {
        return None;
    }
    Some(ctx.department_ids().into_iter().collect())
}

/// Children without a department of their own belong to the parent's and
/// always pass.
fn admits(allowed: &HashSet<Uuid>, child: &Resource) -> bool {
    child.public_zone || child.department_id.is_none_or(|d| allowed.contains(&d))
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    /// The children of `parent_id` that `user_id` may see, each with its
    /// resolved grant.
    ///
    /// A child whose own lookup fails is left out and listed in
    /// `omitted`. Malformed tree data (a document with children, a child
    /// pointing at another parent) rejects the whole request.
    pub async fn list_visible_children(
        &self,
        parent_id: Uuid,
        user_id: Uuid,
    ) -> FolioResult<VisibleChildren> {
        let parent = self.fetch_resource(parent_id).await?;
        let ctx = self.load_context(user_id).await?;
        let cache = ResolutionCache::default();

        let parent_grant = self.grant(&parent, &ctx, Some(&cache)).await?;
        if !parent_grant.is_visible() {
            return Err(FolioError::forbidden(format!(
                "user {user_id} has no access to resource {parent_id}"
            )));
        }

        let mut warnings = Warnings::new(ctx.warnings.clone());
        let listed = bounded(
            self.config.upstream_timeout,
            Lookup::Children,
            self.store.list_children(parent.id),
        )
        .await;
        let children = warnings.absorb(Lookup::Children, listed)?;

        check_children(&parent, &children).inspect_err(|err| {
            error!(parent_id = %parent_id, error = %err, "Malformed resource tree");
        })?;

        let mut allow_list = isolation_allow_list(&parent, &parent_grant, &ctx);
        if let (Some(allowed), Some(home)) = (allow_list.as_mut(), ctx.home_department()) {
            let subtree = match &ctx.tree {
                Some(tree) => tree.descendants(home),
                None => self
                    .department_tree(&mut warnings)
                    .await?
                    .map(|tree| tree.descendants(home))
                    .unwrap_or_default(),
            };
            allowed.extend(subtree);
        }
        let total = children.len();
        let candidates: Vec<Resource> = match &allow_list {
            Some(allowed) => children.into_iter().filter(|c| admits(allowed, c)).collect(),
            None => children,
        };

        let mut outcomes = self.grant_all(&candidates, &ctx, &cache).await;

        let mut visible = Vec::new();
        let mut omitted = Vec::new();
        for child in candidates {
            match outcomes.remove(&child.id) {
                Some(Ok(grant)) if grant.is_visible() => visible.push(VisibleChild {
                    resource: child,
                    grant,
                }),
                Some(Ok(_)) | None => {}
                Some(Err(err @ FolioError::InvariantViolation(_))) => {
                    error!(resource_id = %child.id, error = %err, "Invariant violation in listing");
                    return Err(err);
                }
                Some(Err(err)) => {
                    warn!(resource_id = %child.id, error = %err, "Omitting child from listing");
                    omitted.push(Omission {
                        resource_id: child.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            parent_id = %parent_id,
            user_id = %user_id,
            listed = total,
            visible = visible.len(),
            omitted = omitted.len(),
            isolated = allow_list.is_some(),
            "Listed visible children"
        );

        Ok(VisibleChildren {
            parent_id,
            parent_grant,
            children: visible,
            isolated: allow_list.is_some(),
            omitted,
            warnings: warnings.into_vec(),
        })
    }

    /// Resolve many resources with bounded parallelism. Results are keyed
    /// by resource id; arrival order carries no meaning.
    pub(crate) async fn grant_all(
        &self,
        resources: &[Resource],
        ctx: &UserContext,
        cache: &ResolutionCache,
    ) -> HashMap<Uuid, FolioResult<RoleResult>> {
        let lookups: Vec<_> = resources
            .iter()
            .map(|resource| async move {
                (resource.id, self.grant(resource, ctx, Some(cache)).await)
            })
            .collect();
        stream::iter(lookups)
            .buffer_unordered(self.config.fanout_limit.max(1))
            .collect()
            .await
    }
}

fn check_children(parent: &Resource, children: &[Resource]) -> Result<(), AccessError> {
    if parent.is_document() && !children.is_empty() {
        return Err(AccessError::DocumentWithChildren {
            resource_id: parent.id,
        });
    }
    for child in children {
        if child.id == parent.id {
            return Err(AccessError::CycleDetected {
                resource_id: child.id,
            });
        }
        if child.parent_id != Some(parent.id) {
            return Err(AccessError::ParentMismatch {
                child_id: child.id,
                parent_id: parent.id,
            });
        }
    }
    Ok(())
}
