//! Explicit share management and the share-centred views.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use folio_core::error::{FolioError, FolioResult};
use folio_core::models::grant::{Degradation, Lookup, Omission};
use folio_core::models::resource::{Resource, SpaceType};
use folio_core::models::role::Role;
use folio_core::models::share::Share;
use folio_core::repository::{GrantStore, MembershipProvider};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AccessError;
use crate::service::AccessService;
use crate::upstream::{Warnings, bounded};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedItem {
    pub resource: Resource,
    pub share: Share,
}

/// The virtual "shared with me" view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedWithMe {
    pub user_id: Uuid,
    pub items: Vec<SharedItem>,
    /// Shares whose resource no longer exists.
    pub omitted: Vec<Omission>,
    pub warnings: Vec<Degradation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareDirection {
    /// Granted to the user.
    Inbound,
    /// Granted by the user's ownership to someone else.
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareHistoryEntry {
    pub direction: ShareDirection,
    pub share_id: Uuid,
    pub resource_id: Uuid,
    pub resource_name: Option<String>,
    /// The other party: the resource owner for inbound shares, the
    /// grantee for outbound ones.
    pub counterpart: Option<Uuid>,
    pub role: Role,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareHistory {
    pub user_id: Uuid,
    /// Most recently changed first.
    pub entries: Vec<ShareHistoryEntry>,
    pub warnings: Vec<Degradation>,
}

fn ensure_grantable(role: Role) -> FolioResult<()> {
    if role.is_grantable() {
        Ok(())
    } else {
        Err(FolioError::Validation {
            message: format!("role '{role}' cannot be granted by a share"),
        })
    }
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    /// Fail with `Forbidden` unless `caller` is an admin of `resource`.
    /// A degraded evaluation that does not reach admin also fails.
    async fn require_admin(&self, caller: Uuid, resource: &Resource) -> FolioResult<()> {
        let grant = self.resolve_resource(resource, caller).await?;
        if grant.role.at_least(Role::Admin) {
            return Ok(());
        }
        warn!(
            caller = %caller,
            resource_id = %resource.id,
            role = %grant.role,
            degraded = grant.is_degraded(),
            "Share mutation refused"
        );
        Err(AccessError::NotAdmin {
            user_id: caller,
            resource_id: resource.id,
        }
        .into())
    }

    /// Grant `role` on `resource_id` to `user_id`, replacing any existing
    /// share for the pair.
    pub async fn share(
        &self,
        caller: Uuid,
        resource_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> FolioResult<Share> {
        ensure_grantable(role)?;
        let resource = self.fetch_resource(resource_id).await?;
        self.require_admin(caller, &resource).await?;

        let share = bounded(
            self.config.upstream_timeout,
            Lookup::ExplicitShare,
            self.store.upsert_share(resource_id, user_id, role),
        )
        .await?;

        info!(
            caller = %caller,
            share_id = %share.id,
            resource_id = %resource_id,
            user_id = %user_id,
            role = %role,
            "Share granted"
        );
        Ok(share)
    }

    /// Change the role on an existing share.
    pub async fn update_share(&self, caller: Uuid, share_id: Uuid, role: Role) -> FolioResult<Share> {
        ensure_grantable(role)?;
        let existing = self.fetch_share(share_id).await?;
        let resource = self.fetch_resource(existing.resource_id).await?;
        self.require_admin(caller, &resource).await?;

        let share = bounded(
            self.config.upstream_timeout,
            Lookup::ExplicitShare,
            self.store
                .upsert_share(existing.resource_id, existing.user_id, role),
        )
        .await?;

        info!(
            caller = %caller,
            share_id = %share.id,
            from = %existing.role,
            to = %role,
            "Share updated"
        );
        Ok(share)
    }

    /// Delete a share. The grantee falls back to whatever implicit sources
    /// still apply.
    pub async fn revoke_share(&self, caller: Uuid, share_id: Uuid) -> FolioResult<()> {
        let existing = self.fetch_share(share_id).await?;
        let resource = self.fetch_resource(existing.resource_id).await?;
        self.require_admin(caller, &resource).await?;

        bounded(
            self.config.upstream_timeout,
            Lookup::ExplicitShare,
            self.store.delete_share(share_id),
        )
        .await?;

        info!(
            caller = %caller,
            share_id = %share_id,
            resource_id = %existing.resource_id,
            user_id = %existing.user_id,
            "Share revoked"
        );
        Ok(())
    }

    async fn fetch_share(&self, share_id: Uuid) -> FolioResult<Share> {
        bounded(
            self.config.upstream_timeout,
            Lookup::ExplicitShare,
            self.store.get_share(share_id),
        )
        .await
    }

    /// Resources explicitly shared with `user_id`, excluding the public
    /// library's roots.
    pub async fn shared_with_me(&self, user_id: Uuid) -> FolioResult<SharedWithMe> {
        let limit = self.config.upstream_timeout;
        let mut warnings = Warnings::default();

        let shares = bounded(
            limit,
            Lookup::UserShares,
            self.store.list_shares_for_user(user_id),
        )
        .await;
        let shares = warnings.absorb(Lookup::UserShares, shares)?;

        let ids: Vec<Uuid> = shares.iter().map(|s| s.resource_id).collect();
        let fetched = if ids.is_empty() {
            Ok(Vec::new())
        } else {
            bounded(limit, Lookup::Resource, self.store.get_resources(ids)).await
        };
        let degraded = fetched.as_ref().is_err_and(FolioError::is_upstream);
        let mut resources: HashMap<Uuid, Resource> = warnings
            .absorb(Lookup::Resource, fetched)?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let mut items = Vec::new();
        let mut omitted = Vec::new();
        for share in shares {
            match resources.remove(&share.resource_id) {
                Some(resource) => {
                    if resource.space == SpaceType::Public && resource.is_space_root() {
                        continue;
                    }
                    items.push(SharedItem { resource, share });
                }
                None if degraded => {}
                None => omitted.push(Omission {
                    resource_id: share.resource_id,
                    reason: "shared resource no longer exists".into(),
                }),
            }
        }

        Ok(SharedWithMe {
            user_id,
            items,
            omitted,
            warnings: warnings.into_vec(),
        })
    }

    /// Shares granted to `user_id` and shares on resources `user_id` owns.
    pub async fn share_history(&self, user_id: Uuid) -> FolioResult<ShareHistory> {
        let limit = self.config.upstream_timeout;
        let mut warnings = Warnings::default();

        let (inbound, owned) = tokio::join!(
            bounded(
                limit,
                Lookup::UserShares,
                self.store.list_shares_for_user(user_id),
            ),
            bounded(
                limit,
                Lookup::OwnedResources,
                self.store.list_resources_owned_by(user_id),
            ),
        );
        let inbound = warnings.absorb(Lookup::UserShares, inbound)?;
        let owned = warnings.absorb(Lookup::OwnedResources, owned)?;

        let inbound_ids: Vec<Uuid> = inbound.iter().map(|s| s.resource_id).collect();
        let inbound_resources: HashMap<Uuid, Resource> = if inbound_ids.is_empty() {
            HashMap::new()
        } else {
            let fetched =
                bounded(limit, Lookup::Resource, self.store.get_resources(inbound_ids)).await;
            warnings
                .absorb(Lookup::Resource, fetched)?
                .into_iter()
                .map(|r| (r.id, r))
                .collect()
        };

        let mut entries: Vec<ShareHistoryEntry> = inbound
            .into_iter()
            .map(|share| {
                let resource = inbound_resources.get(&share.resource_id);
                ShareHistoryEntry {
                    direction: ShareDirection::Inbound,
                    share_id: share.id,
                    resource_id: share.resource_id,
                    resource_name: resource.map(|r| r.name.clone()),
                    counterpart: resource.and_then(|r| r.owner_id),
                    role: share.role,
                    updated_at: share.updated_at,
                }
            })
            .collect();

        let outbound: Vec<(Resource, FolioResult<Vec<Share>>)> = stream::iter(owned)
            .map(|resource| async move {
                let listed = bounded(
                    limit,
                    Lookup::ResourceShares,
                    self.store.list_shares_for_resource(resource.id),
                )
                .await;
                (resource, listed)
            })
            .buffer_unordered(self.config.fanout_limit.max(1))
            .collect()
            .await;

        for (resource, listed) in outbound {
            for share in warnings.absorb(Lookup::ResourceShares, listed)? {
                if share.user_id == user_id {
                    continue;
                }
                entries.push(ShareHistoryEntry {
                    direction: ShareDirection::Outbound,
                    share_id: share.id,
                    resource_id: resource.id,
                    resource_name: Some(resource.name.clone()),
                    counterpart: Some(share.user_id),
                    role: share.role,
                    updated_at: share.updated_at,
                });
            }
        }

        entries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(a.share_id.cmp(&b.share_id))
        });

        Ok(ShareHistory {
            user_id,
            entries,
            warnings: warnings.into_vec(),
        })
    }
}
