//! Who has access to a resource, and why.

use std::collections::{BTreeMap, HashMap};

use folio_core::error::FolioResult;
use folio_core::models::grant::{
    Candidate, Degradation, DepartmentRelation, GrantSource, Lookup, RoleResult,
};
use folio_core::models::membership::{Department, DepartmentMember};
use folio_core::models::resource::{Resource, SpaceType};
use folio_core::models::role::{DepartmentGrade, Role};
use folio_core::repository::{GrantStore, MembershipProvider};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::department::DepartmentTree;
use crate::service::AccessService;
use crate::upstream::{Warnings, bounded};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub user_id: Uuid,
    pub role: Role,
    pub sources: Vec<Candidate>,
    pub share_id: Option<Uuid>,
    /// Only explicit shares can be revoked from the roster.
    pub revocable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberRoster {
    pub resource_id: Uuid,
    /// Highest role first, then by user id.
    pub members: Vec<Member>,
    /// Every authenticated user can view the resource (public library or a
    /// space root); those users are not enumerated.
    pub open_to_everyone: bool,
    pub warnings: Vec<Degradation>,
}

type Roster = BTreeMap<Uuid, Vec<Candidate>>;

fn add(roster: &mut Roster, user_id: Uuid, role: Role, source: GrantSource) {
    roster
        .entry(user_id)
        .or_default()
        .push(Candidate { role, source });
}

impl<G: GrantStore, M: MembershipProvider> AccessService<G, M> {
    /// Everyone with a role on `resource_id` through ownership, explicit
    /// shares, department or project membership. Super-admins are not
    /// listed.
    pub async fn list_members(&self, resource_id: Uuid) -> FolioResult<MemberRoster> {
        let resource = self.fetch_resource(resource_id).await?;
        let limit = self.config.upstream_timeout;
        let mut warnings = Warnings::default();
        let mut roster = Roster::new();

        if let Some(owner) = resource.owner_id {
            add(&mut roster, owner, Role::Admin, GrantSource::Owner);
        }

        let shares = bounded(
            limit,
            Lookup::ResourceShares,
            self.store.list_shares_for_resource(resource.id),
        )
        .await;
        for share in warnings.absorb(Lookup::ResourceShares, shares)? {
            add(
                &mut roster,
                share.user_id,
                share.role,
                GrantSource::ExplicitShare { share_id: share.id },
            );
        }

        if !resource.restricted {
            if let Some(department_id) = resource.department_id {
                self.add_department_members(&resource, department_id, &mut roster, &mut warnings)
                    .await?;
            }
            if let Some(project_id) = resource.project_id {
                let listed = bounded(
                    limit,
                    Lookup::ProjectMembers,
                    self.directory.list_project_members(project_id),
                )
                .await;
                for member in warnings.absorb(Lookup::ProjectMembers, listed)? {
                    if !member.role.is_none() {
                        add(
                            &mut roster,
                            member.user_id,
                            member.role,
                            GrantSource::Project { project_id },
                        );
                    }
                }
            }
        }

        let mut members: Vec<Member> = roster
            .into_iter()
            .map(|(user_id, sources)| {
                let result = RoleResult::from_candidates(sources, Vec::new());
                let share_id = result.share_id();
                Member {
                    user_id,
                    role: result.role,
                    sources: result.sources,
                    share_id,
                    revocable: share_id.is_some(),
                }
            })
            .collect();
        members.sort_by(|a, b| b.role.cmp(&a.role).then(a.user_id.cmp(&b.user_id)));

        debug!(
            resource_id = %resource_id,
            members = members.len(),
            "Listed resource members"
        );

        Ok(MemberRoster {
            resource_id,
            members,
            open_to_everyone: !resource.restricted
                && (resource.space == SpaceType::Public || resource.is_space_root()),
            warnings: warnings.into_vec(),
        })
    }

    /// Members of the resource's department and its sub-departments get
    /// their grade role; managers of an ancestor department get admin.
    async fn add_department_members(
        &self,
        resource: &Resource,
        department_id: Uuid,
        roster: &mut Roster,
        warnings: &mut Warnings,
    ) -> FolioResult<()> {
        let limit = self.config.upstream_timeout;
        let listed = bounded(
            limit,
            Lookup::DepartmentTree,
            self.directory.list_departments(),
        )
        .await;
        let departments: Vec<Department> = warnings.absorb(Lookup::DepartmentTree, listed)?;
        let tree = DepartmentTree::new(&departments, self.config.max_depth);

        let mut below = vec![department_id];
        below.extend(tree.descendants(department_id));
        let above: Vec<Uuid> = tree.lineage(department_id)?.into_iter().skip(1).collect();

        let queried: Vec<Uuid> = below.iter().chain(above.iter()).copied().collect();
        let mut fetched: HashMap<Uuid, FolioResult<Vec<DepartmentMember>>> =
            stream::iter(queried)
                .map(|id| async move {
                    let listed = bounded(
                        limit,
                        Lookup::DepartmentMembers,
                        self.directory.list_department_members(id),
                    )
                    .await;
                    (id, listed)
                })
                .buffer_unordered(self.config.fanout_limit.max(1))
                .collect()
                .await;

        for id in &below {
            let listed = fetched.remove(id).unwrap_or_else(|| Ok(Vec::new()));
            let relation = if *id == department_id {
                DepartmentRelation::Own
            } else {
                DepartmentRelation::ParentDepartment
            };
            for member in warnings.absorb(Lookup::DepartmentMembers, listed)? {
                add(
                    roster,
                    member.user_id,
                    member.grade.folder_role(),
                    GrantSource::Department {
                        department_id,
                        grade: member.grade,
                        relation,
                    },
                );
                if resource.public_zone {
                    add(
                        roster,
                        member.user_id,
                        Role::Editor,
                        GrantSource::PublicZone { department_id },
                    );
                }
            }
        }

        for id in &above {
            let listed = fetched.remove(id).unwrap_or_else(|| Ok(Vec::new()));
            for member in warnings.absorb(Lookup::DepartmentMembers, listed)? {
                if member.grade.is_manager() {
                    add(
                        roster,
                        member.user_id,
                        Role::Admin,
                        GrantSource::Department {
                            department_id,
                            grade: DepartmentGrade::Manager,
                            relation: DepartmentRelation::ManagedSubdepartment,
                        },
                    );
                }
            }
        }

        Ok(())
    }
}
