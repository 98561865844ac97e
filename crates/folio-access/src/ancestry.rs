//! Parent-chain walks.

use std::collections::{HashMap, HashSet};

use folio_core::error::FolioResult;
use folio_core::models::resource::Resource;
use folio_core::repository::{GrantStore, MembershipProvider};
use tracing::error;
use uuid::Uuid;

use crate::error::AccessError;
use crate::service::AccessService;

/// How far a walk got through the resources known so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walk {
    /// Reached a space root. Ancestor ids, nearest first.
    Complete(Vec<Uuid>),
    /// Stopped at a parent that is not in the known set.
    Missing { ancestors: Vec<Uuid>, missing: Uuid },
}

/// Follow `parent_id` links from `start` through `known`.
///
/// A repeated id or a chain longer than `max_depth` is malformed data and
/// fails instead of being repaired.
pub fn walk_up(
    start: &Resource,
    known: &HashMap<Uuid, Resource>,
    max_depth: usize,
) -> Result<Walk, AccessError> {
    let mut seen = HashSet::from([start.id]);
    let mut ancestors = Vec::new();
    let mut current = start;

    while let Some(parent_id) = current.parent_id {
        if !seen.insert(parent_id) {
            return Err(AccessError::CycleDetected {
                resource_id: parent_id,
            });
        }
        if ancestors.len() >= max_depth {
            return Err(AccessError::DepthExceeded {
                resource_id: start.id,
                max_depth,
            });
        }
        let Some(parent) = known.get(&parent_id) else {
            return Ok(Walk::Missing {
                ancestors,
                missing: parent_id,
            });
        };
        ancestors.push(parent_id);
        current = parent;
    }

    Ok(Walk::Complete(ancestors))
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    /// Every ancestor of `resource_id`, space root first.
    pub async fn ancestors(&self, resource_id: Uuid) -> FolioResult<Vec<Resource>> {
        let resource = self.fetch_resource(resource_id).await?;
        let mut known: HashMap<Uuid, Resource> = HashMap::new();

        loop {
            let walk = walk_up(&resource, &known, self.config.max_depth).inspect_err(|err| {
                error!(resource_id = %resource_id, error = %err, "Malformed parent chain");
            })?;
            match walk {
                Walk::Complete(ids) => {
                    return Ok(ids
                        .into_iter()
                        .rev()
                        .filter_map(|id| known.remove(&id))
                        .collect());
                }
                Walk::Missing { missing, .. } => {
                    let parent = self.fetch_resource(missing).await?;
                    known.insert(parent.id, parent);
                }
            }
        }
    }
}
