//! SurrealDB implementation of [`GrantStore`].

use chrono::{DateTime, Utc};
use folio_core::error::{FolioError, FolioResult};
use folio_core::models::resource::{
    CreateResource, Resource, ResourceKind, SpaceType, UpdateResource,
};
use folio_core::models::role::Role;
use folio_core::models::share::Share;
use folio_core::repository::GrantStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{ids_to_strings, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

const SELECT_RESOURCE: &str = "SELECT meta::id(id) AS record_id, * FROM resource";
const SELECT_SHARE: &str = "SELECT meta::id(id) AS record_id, * FROM share";
const RESOURCE_BY_ID: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('resource', $id)";
const SHARE_BY_ID: &str = "SELECT meta::id(id) AS record_id, * FROM type::record('share', $id)";

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    record_id: String,
    name: String,
    kind: String,
    parent_id: Option<String>,
    space: String,
    owner_id: Option<String>,
    restricted: bool,
    public_zone: bool,
    department_id: Option<String>,
    project_id: Option<String>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceRow {
    fn try_into_resource(self) -> Result<Resource, DbError> {
        let kind = match self.kind.as_str() {
            "folder" => ResourceKind::Folder,
            "document" => ResourceKind::Document,
            other => return Err(DbError::Decode(format!("unknown resource kind '{other}'"))),
        };
        let space = match self.space.as_str() {
            "public" => SpaceType::Public,
            "department" => SpaceType::Department,
            "project" => SpaceType::Project,
            other => return Err(DbError::Decode(format!("unknown space '{other}'"))),
        };
        Ok(Resource {
            id: parse_uuid("resource", &self.record_id)?,
            name: self.name,
            kind,
            parent_id: parse_opt_uuid("parent", self.parent_id)?,
            space,
            owner_id: parse_opt_uuid("owner", self.owner_id)?,
            restricted: self.restricted,
            public_zone: self.public_zone,
            department_id: parse_opt_uuid("department", self.department_id)?,
            project_id: parse_opt_uuid("project", self.project_id)?,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ShareRow {
    record_id: String,
    resource_id: String,
    user_id: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShareRow {
    fn try_into_share(self) -> Result<Share, DbError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e: FolioError| DbError::Decode(e.to_string()))?;
        Ok(Share {
            id: parse_uuid("share", &self.record_id)?,
            resource_id: parse_uuid("resource", &self.resource_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct DeletedShareRow {
    #[allow(dead_code)]
    role: String,
}

fn into_resources(rows: Vec<ResourceRow>) -> FolioResult<Vec<Resource>> {
    rows.into_iter()
        .map(ResourceRow::try_into_resource)
        .collect::<Result<Vec<_>, DbError>>()
        .map_err(Into::into)
}

fn into_shares(rows: Vec<ShareRow>) -> FolioResult<Vec<Share>> {
    rows.into_iter()
        .map(ShareRow::try_into_share)
        .collect::<Result<Vec<_>, DbError>>()
        .map_err(Into::into)
}

/// SurrealDB-backed resource metadata and explicit shares.
#[derive(Clone)]
pub struct SurrealGrantStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGrantStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_resources(
        &self,
        filter: &str,
        key: &'static str,
        value: Vec<String>,
    ) -> FolioResult<Vec<Resource>> {
        if value.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .db
            .query(format!("{SELECT_RESOURCE} WHERE {filter} ORDER BY name ASC"))
            .bind((key, value))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        into_resources(rows)
    }
}

impl<C: Connection> GrantStore for SurrealGrantStore<C> {
    async fn get_resource(&self, id: Uuid) -> FolioResult<Resource> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(RESOURCE_BY_ID)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        row.try_into_resource().map_err(Into::into)
    }

    async fn get_resources(&self, ids: Vec<Uuid>) -> FolioResult<Vec<Resource>> {
        self.select_resources("meta::id(id) IN $ids", "ids", ids_to_strings(&ids))
            .await
    }

    async fn create_resource(&self, input: CreateResource) -> FolioResult<Resource> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('resource', $id) SET \
                 name = $name, kind = $kind, parent_id = $parent_id, \
                 space = $space, owner_id = $owner_id, \
                 restricted = $restricted, public_zone = $public_zone, \
                 department_id = $department_id, project_id = $project_id;",
            )
            .query(RESOURCE_BY_ID)
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("kind", input.kind.as_str()))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .bind(("space", input.space.as_str()))
            .bind(("owner_id", input.owner_id.map(|o| o.to_string())))
            .bind(("restricted", input.restricted))
            .bind(("public_zone", input.public_zone))
            .bind(("department_id", input.department_id.map(|d| d.to_string())))
            .bind(("project_id", input.project_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        row.try_into_resource().map_err(Into::into)
    }

    async fn update_resource(&self, id: Uuid, input: UpdateResource) -> FolioResult<Resource> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.owner_id.is_some() {
            sets.push("owner_id = $owner_id");
        }
        if input.restricted.is_some() {
            sets.push("restricted = $restricted");
        }
        if input.public_zone.is_some() {
            sets.push("public_zone = $public_zone");
        }
        if input.department_id.is_some() {
            sets.push("department_id = $department_id");
        }
        if input.project_id.is_some() {
            sets.push("project_id = $project_id");
        }
        sets.push("revision += 1");
        sets.push("updated_at = time::now()");

        // A missing record updates nothing, so the SELECT below comes back
        // empty and reports NotFound.
        let mut builder = self
            .db
            .query(format!(
                "UPDATE type::record('resource', $id) SET {};",
                sets.join(", ")
            ))
            .query(RESOURCE_BY_ID)
            .bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(owner_id) = input.owner_id {
            builder = builder.bind(("owner_id", owner_id.map(|o| o.to_string())));
        }
        if let Some(restricted) = input.restricted {
            builder = builder.bind(("restricted", restricted));
        }
        if let Some(public_zone) = input.public_zone {
            builder = builder.bind(("public_zone", public_zone));
        }
        if let Some(department_id) = input.department_id {
            builder = builder.bind(("department_id", department_id.map(|d| d.to_string())));
        }
        if let Some(project_id) = input.project_id {
            builder = builder.bind(("project_id", project_id.map(|p| p.to_string())));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        row.try_into_resource().map_err(Into::into)
    }

    async fn list_children(&self, parent_id: Uuid) -> FolioResult<Vec<Resource>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_RESOURCE} WHERE parent_id = $parent_id ORDER BY name ASC"
            ))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        into_resources(rows)
    }

    async fn list_space_roots(&self) -> FolioResult<Vec<Resource>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_RESOURCE} WHERE parent_id IS NONE ORDER BY name ASC"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        into_resources(rows)
    }

    async fn list_resources_owned_by(&self, user_id: Uuid) -> FolioResult<Vec<Resource>> {
        self.select_resources("owner_id IN $owners", "owners", vec![user_id.to_string()])
            .await
    }

    async fn list_resources_in_departments(
        &self,
        department_ids: Vec<Uuid>,
    ) -> FolioResult<Vec<Resource>> {
        self.select_resources(
            "department_id IN $departments",
            "departments",
            ids_to_strings(&department_ids),
        )
        .await
    }

    async fn list_resources_in_projects(&self, project_ids: Vec<Uuid>) -> FolioResult<Vec<Resource>> {
        self.select_resources(
            "project_id IN $projects",
            "projects",
            ids_to_strings(&project_ids),
        )
        .await
    }

    async fn list_resources_in_space(&self, space: SpaceType) -> FolioResult<Vec<Resource>> {
        self.select_resources("space IN $spaces", "spaces", vec![space.as_str().to_string()])
            .await
    }

    async fn list_all_resources(&self) -> FolioResult<Vec<Resource>> {
        let mut result = self
            .db
            .query(format!("{SELECT_RESOURCE} ORDER BY name ASC"))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        into_resources(rows)
    }

    async fn get_explicit_share(
        &self,
        resource_id: Uuid,
        user_id: Uuid,
    ) -> FolioResult<Option<Share>> {
        let mut result = self
            .db
            .query(SHARE_BY_ID)
            .bind(("id", Share::key(resource_id, user_id).to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShareRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(ShareRow::try_into_share)
            .transpose()
            .map_err(Into::into)
    }

    async fn get_share(&self, share_id: Uuid) -> FolioResult<Share> {
        let id_str = share_id.to_string();

        let mut result = self
            .db
            .query(SHARE_BY_ID)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShareRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "share".into(),
            id: id_str,
        })?;

        row.try_into_share().map_err(Into::into)
    }

    async fn upsert_share(&self, resource_id: Uuid, user_id: Uuid, role: Role) -> FolioResult<Share> {
        if !role.is_grantable() {
            return Err(FolioError::Validation {
                message: format!("role '{role}' cannot be stored on a share"),
            });
        }

        // The record key is derived from the pair, so concurrent upserts
        // for the same pair land on the same record.
        let id_str = Share::key(resource_id, user_id).to_string();

        let result = self
            .db
            .query(
                "UPSERT type::record('share', $id) SET \
                 resource_id = $resource_id, user_id = $user_id, \
                 role = $role, updated_at = time::now();",
            )
            .query(SHARE_BY_ID)
            .bind(("id", id_str.clone()))
            .bind(("resource_id", resource_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role", role.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<ShareRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "share".into(),
            id: id_str,
        })?;

        row.try_into_share().map_err(Into::into)
    }

    async fn delete_share(&self, share_id: Uuid) -> FolioResult<()> {
        let id_str = share_id.to_string();

        let mut result = self
            .db
            .query("DELETE type::record('share', $id) RETURN BEFORE")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DeletedShareRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "share".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }

    async fn list_shares_for_user(&self, user_id: Uuid) -> FolioResult<Vec<Share>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_SHARE} WHERE user_id = $user_id ORDER BY updated_at DESC"
            ))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShareRow> = result.take(0).map_err(DbError::from)?;
        into_shares(rows)
    }

    async fn list_shares_for_resource(&self, resource_id: Uuid) -> FolioResult<Vec<Share>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_SHARE} WHERE resource_id = $resource_id ORDER BY updated_at DESC"
            ))
            .bind(("resource_id", resource_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShareRow> = result.take(0).map_err(DbError::from)?;
        into_shares(rows)
    }
}
