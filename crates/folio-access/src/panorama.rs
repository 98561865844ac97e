//! Everything a user can see, anywhere in the tree.
//!
//! Candidates are gathered from every place a grant can come from (owned
//! resources, explicit shares, department and project resources, the public
//! library and the space roots), evaluated once each, and annotated with
//! their ancestor chain. [`PanoramaForest`] turns the flat list back into a
//! renderable forest.

use std::collections::{BTreeMap, HashMap, HashSet};

use folio_core::error::{FolioError, FolioResult};
use folio_core::models::grant::{Candidate, Degradation, Lookup, Omission, RoleResult};
use folio_core::models::resource::{Resource, SpaceType};
use folio_core::models::role::Role;
use folio_core::models::share::Share;
use folio_core::repository::{GrantStore, MembershipProvider};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ancestry::{Walk, walk_up};
use crate::context::UserContext;
use crate::resolver::candidates;
use crate::service::AccessService;
use crate::upstream::{Warnings, bounded};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanoramaEntry {
    pub resource: Resource,
    pub role: Role,
    pub sources: Vec<Candidate>,
    /// Space root first, parent last. Starts at the highest loaded
    /// ancestor when part of the chain could not be fetched.
    pub ancestors: Vec<AncestorRef>,
    /// Set when an explicit share backs the entry; revoking it is possible.
    pub share_id: Option<Uuid>,
    pub revocable: bool,
    /// Held only through implicit sources or ownership.
    pub inherited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panorama {
    pub user_id: Uuid,
    pub entries: Vec<PanoramaEntry>,
    pub omitted: Vec<Omission>,
    pub warnings: Vec<Degradation>,
}

impl Panorama {
    pub fn forest(&self) -> PanoramaForest {
        PanoramaForest::build(&self.entries)
    }
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    /// Every resource `user_id` holds a role on, one entry per resource
    /// with all of its sources.
    pub async fn build_panorama(&self, user_id: Uuid) -> FolioResult<Panorama> {
        let ctx = self.load_context(user_id).await?;
        let mut warnings = Warnings::new(ctx.warnings.clone());

        let (shares, gathered) = tokio::join!(
            bounded(
                self.config.upstream_timeout,
                Lookup::UserShares,
                self.store.list_shares_for_user(user_id),
            ),
            self.gather_candidates(&ctx),
        );
        let shares: HashMap<Uuid, Share> = warnings
            .absorb(Lookup::UserShares, shares)?
            .into_iter()
            .map(|s| (s.resource_id, s))
            .collect();
        let (mut pool, gather_warnings) = gathered?;
        warnings.extend(gather_warnings);

        let unseen: Vec<Uuid> = shares
            .keys()
            .filter(|id| !pool.contains_key(id))
            .copied()
            .collect();
        if !unseen.is_empty() {
            let fetched = bounded(
                self.config.upstream_timeout,
                Lookup::UserShares,
                self.store.get_resources(unseen),
            )
            .await;
            pool.extend(
                warnings
                    .absorb(Lookup::UserShares, fetched)?
                    .into_iter()
                    .map(|r| (r.id, r)),
            );
        }

        let granted: Vec<(Uuid, RoleResult)> = pool
            .values()
            .map(|r| {
                let result = RoleResult::from_candidates(
                    candidates(r, &ctx, shares.get(&r.id)),
                    Vec::new(),
                );
                (r.id, result)
            })
            .filter(|(_, result)| result.is_visible())
            .collect();

        let mut known: HashMap<Uuid, Resource> = pool.into_iter().collect();
        let unloaded = self
            .load_ancestors(
                granted.iter().map(|(id, _)| *id),
                &mut known,
                &mut warnings,
            )
            .await?;

        let mut entries = Vec::with_capacity(granted.len());
        let mut omitted = Vec::new();
        for (id, result) in granted {
            let Some(resource) = known.get(&id) else {
                continue;
            };
            let (ancestors, missing) = self.chain(resource, &known)?;
            if let Some(missing) = missing {
                if unloaded.contains(&missing) {
                    debug!(
                        resource_id = %id,
                        missing = %missing,
                        "Keeping panorama entry with a partial ancestor chain"
                    );
                } else {
                    warn!(
                        resource_id = %id,
                        missing = %missing,
                        "Omitting panorama entry with dangling parent"
                    );
                    omitted.push(Omission {
                        resource_id: id,
                        reason: format!("ancestor {missing} does not exist"),
                    });
                    continue;
                }
            }
            let share_id = result.share_id();
            entries.push(PanoramaEntry {
                resource: resource.clone(),
                role: result.role,
                sources: result.sources,
                ancestors,
                share_id,
                revocable: share_id.is_some(),
                inherited: share_id.is_none(),
            });
        }

        entries.sort_by(|a, b| {
            (a.ancestors.len(), &a.resource.name, a.resource.id).cmp(&(
                b.ancestors.len(),
                &b.resource.name,
                b.resource.id,
            ))
        });

        info!(
            user_id = %user_id,
            entries = entries.len(),
            omitted = omitted.len(),
            "Built panorama"
        );

        Ok(Panorama {
            user_id,
            entries,
            omitted,
            warnings: warnings.into_vec(),
        })
    }

    /// Candidate resources keyed by id, so a resource reachable through
    /// several sources is evaluated once.
    async fn gather_candidates(
        &self,
        ctx: &UserContext,
    ) -> FolioResult<(BTreeMap<Uuid, Resource>, Vec<Degradation>)> {
        let limit = self.config.upstream_timeout;
        let mut warnings = Warnings::default();
        let mut pool = BTreeMap::new();

        if ctx.super_admin {
            let all = bounded(limit, Lookup::AllResources, self.store.list_all_resources()).await;
            for r in warnings.absorb(Lookup::AllResources, all)? {
                pool.insert(r.id, r);
            }
            return Ok((pool, warnings.into_vec()));
        }

        let department_ids = ctx.reachable_departments();
        let project_ids: Vec<Uuid> = ctx.projects.keys().copied().collect();

        let (owned, departments, projects, public, roots) = tokio::join!(
            bounded(
                limit,
                Lookup::OwnedResources,
                self.store.list_resources_owned_by(ctx.user_id),
            ),
            bounded(
                limit,
                Lookup::DepartmentResources,
                self.store.list_resources_in_departments(department_ids),
            ),
            bounded(
                limit,
                Lookup::ProjectResources,
                self.store.list_resources_in_projects(project_ids),
            ),
            bounded(
                limit,
                Lookup::SpaceResources,
                self.store.list_resources_in_space(SpaceType::Public),
            ),
            bounded(limit, Lookup::Resource, self.store.list_space_roots()),
        );

        for (lookup, listed) in [
            (Lookup::OwnedResources, owned),
            (Lookup::DepartmentResources, departments),
            (Lookup::ProjectResources, projects),
            (Lookup::SpaceResources, public),
            (Lookup::Resource, roots),
        ] {
            for r in warnings.absorb(lookup, listed)? {
                pool.insert(r.id, r);
            }
        }

        Ok((pool, warnings.into_vec()))
    }

    /// Fetch missing ancestors level by level until every chain either
    /// reaches a root or hits a parent that cannot be loaded. Returns the
    /// parents whose fetch was degraded, as opposed to parents that do not
    /// exist.
    async fn load_ancestors(
        &self,
        ids: impl Iterator<Item = Uuid> + Clone,
        known: &mut HashMap<Uuid, Resource>,
        warnings: &mut Warnings,
    ) -> FolioResult<HashSet<Uuid>> {
        let mut unloaded = HashSet::new();
        for _ in 0..=self.config.max_depth {
            let mut missing = Vec::new();
            for id in ids.clone() {
                let Some(resource) = known.get(&id) else {
                    continue;
                };
                if let Walk::Missing { missing: parent, .. } =
                    self.walk(resource, known)?
                {
                    if !missing.contains(&parent) {
                        missing.push(parent);
                    }
                }
            }
            if missing.is_empty() {
                break;
            }

            let fetched = bounded(
                self.config.upstream_timeout,
                Lookup::Resource,
                self.store.get_resources(missing.clone()),
            )
            .await;
            if matches!(&fetched, Err(err) if err.is_upstream()) {
                unloaded.extend(missing);
            }
            let fetched = warnings.absorb(Lookup::Resource, fetched)?;
            if fetched.is_empty() {
                break;
            }
            known.extend(fetched.into_iter().map(|r| (r.id, r)));
        }
        Ok(unloaded)
    }

    fn walk(&self, resource: &Resource, known: &HashMap<Uuid, Resource>) -> FolioResult<Walk> {
        walk_up(resource, known, self.config.max_depth).map_err(|err| {
            error!(resource_id = %resource.id, error = %err, "Malformed parent chain");
            FolioError::from(err)
        })
    }

    /// The loaded ancestor chain, root-most first, plus the first parent
    /// that is not loaded when the walk stopped short of a root.
    fn chain(
        &self,
        resource: &Resource,
        known: &HashMap<Uuid, Resource>,
    ) -> FolioResult<(Vec<AncestorRef>, Option<Uuid>)> {
        let (ids, missing) = match self.walk(resource, known)? {
            Walk::Complete(ids) => (ids, None),
            Walk::Missing { ancestors, missing } => (ancestors, Some(missing)),
        };
        let chain = ids
            .into_iter()
            .rev()
            .filter_map(|id| known.get(&id))
            .map(|r| AncestorRef {
                id: r.id,
                name: r.name.clone(),
            })
            .collect();
        Ok((chain, missing))
    }
}

// ---------------------------------------------------------------------------
// Forest reconstruction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForestNode {
    pub id: Uuid,
    /// Index into the entry list the forest was built from.
    pub entry: usize,
    pub children: Vec<usize>,
    /// A root only because its real parent is not in the set, or because
    /// it sits on a parent cycle.
    pub synthetic_root: bool,
}

/// Arena of panorama nodes. Node `i` corresponds to entry `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanoramaForest {
    pub nodes: Vec<ForestNode>,
    pub roots: Vec<usize>,
}

impl PanoramaForest {
    pub fn build(entries: &[PanoramaEntry]) -> Self {
        Self::from_links(
            entries
                .iter()
                .map(|e| (e.resource.id, e.resource.parent_id))
                .collect(),
        )
    }

    /// Build from `(id, parent_id)` pairs. Terminates on any input,
    /// including parent cycles and self-parents.
    pub fn from_links(links: Vec<(Uuid, Option<Uuid>)>) -> Self {
        let n = links.len();
        let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(n);
        for (i, (id, _)) in links.iter().enumerate() {
            index.entry(*id).or_insert(i);
        }

        let parent_of: Vec<Option<usize>> = links
            .iter()
            .enumerate()
            .map(|(i, (_, parent))| {
                parent
                    .and_then(|p| index.get(&p).copied())
                    .filter(|&p| p != i)
            })
            .collect();

        // 0 = unvisited, 1 = on the current path, 2 = settled.
        let mut state = vec![0u8; n];
        let mut on_cycle = vec![false; n];
        for start in 0..n {
            if state[start] != 0 {
                continue;
            }
            let mut path = Vec::new();
            let mut current = Some(start);
            while let Some(c) = current {
                match state[c] {
                    0 => {
                        state[c] = 1;
                        path.push(c);
                        current = parent_of[c];
                    }
                    1 => {
                        if let Some(pos) = path.iter().position(|&p| p == c) {
                            for &member in &path[pos..] {
                                on_cycle[member] = true;
                            }
                        }
                        break;
                    }
                    _ => break,
                }
            }
            for p in path {
                state[p] = 2;
            }
        }

        let mut nodes: Vec<ForestNode> = links
            .iter()
            .enumerate()
            .map(|(i, (id, _))| ForestNode {
                id: *id,
                entry: i,
                children: Vec::new(),
                synthetic_root: false,
            })
            .collect();
        let mut roots = Vec::new();

        for i in 0..n {
            match parent_of[i] {
                Some(parent) if !on_cycle[i] => nodes[parent].children.push(i),
                _ => {
                    nodes[i].synthetic_root = links[i].1.is_some();
                    roots.push(i);
                }
            }
        }

        Self { nodes, roots }
    }

    /// Pre-order traversal as `(depth, node)` pairs.
    pub fn depth_first(&self) -> Vec<(usize, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&r| (0, r)).collect();
        while let Some((depth, node)) = stack.pop() {
            order.push((depth, node));
            for &child in self.nodes[node].children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_present_parents_and_marks_orphans() {
        let (root, child, orphan, gone) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let forest = PanoramaForest::from_links(vec![
            (root, None),
            (child, Some(root)),
            (orphan, Some(gone)),
        ]);

        assert_eq!(forest.roots, vec![0, 2]);
        assert_eq!(forest.nodes[0].children, vec![1]);
        assert!(!forest.nodes[0].synthetic_root);
        assert!(forest.nodes[2].synthetic_root);
        assert_eq!(forest.depth_first(), vec![(0, 0), (1, 1), (0, 2)]);
    }

    #[test]
    fn cycles_become_synthetic_roots() {
        let (a, b, hanger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let forest =
            PanoramaForest::from_links(vec![(a, Some(b)), (b, Some(a)), (hanger, Some(a))]);

        assert_eq!(forest.roots, vec![0, 1]);
        assert!(forest.nodes[0].synthetic_root && forest.nodes[1].synthetic_root);
        assert_eq!(forest.nodes[0].children, vec![2]);
        assert_eq!(forest.depth_first().len(), 3);
    }

    #[test]
    fn self_parent_is_a_synthetic_root() {
        let id = Uuid::new_v4();
        let forest = PanoramaForest::from_links(vec![(id, Some(id))]);
        assert_eq!(forest.roots, vec![0]);
        assert!(forest.nodes[0].synthetic_root);
    }
}
