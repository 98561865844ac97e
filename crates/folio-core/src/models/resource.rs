//! Resource domain model.
//!
//! Folders and documents form a forest: every resource except a space root
//! has exactly one parent, and the chain of parents ends at a root of one
//! of the three spaces.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Folder,
    Document,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Folder => "folder",
            ResourceKind::Document => "document",
        }
    }
}

/// Top-level partition of the resource tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    Public,
    Department,
    Project,
}

impl SpaceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SpaceType::Public => "public",
            SpaceType::Department => "department",
            SpaceType::Project => "project",
        }
    }
}

impl fmt::Display for SpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub kind: ResourceKind,
    /// `None` only for space roots.
    pub parent_id: Option<Uuid>,
    pub space: SpaceType,
    /// `None` for system-created resources.
    pub owner_id: Option<Uuid>,
    /// Suppresses every implicit (membership-derived) grant.
    pub restricted: bool,
    /// Cross-cutting "public zone" inside the department space.
    pub public_zone: bool,
    /// Governing department, when it differs from the nominal space.
    pub department_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    /// Bumped by the store on every update.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn is_space_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_document(&self) -> bool {
        self.kind == ResourceKind::Document
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResource {
    pub name: String,
    pub kind: ResourceKind,
    pub parent_id: Option<Uuid>,
    pub space: SpaceType,
    pub owner_id: Option<Uuid>,
    pub restricted: bool,
    pub public_zone: bool,
    pub department_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl CreateResource {
    pub fn folder(name: impl Into<String>, space: SpaceType, parent_id: Option<Uuid>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Folder,
            parent_id,
            space,
            owner_id: None,
            restricted: false,
            public_zone: false,
            department_id: None,
            project_id: None,
        }
    }

    pub fn document(name: impl Into<String>, space: SpaceType, parent_id: Uuid) -> Self {
        Self {
            kind: ResourceKind::Document,
            ..Self::folder(name, space, Some(parent_id))
        }
    }
}

/// `Some(None)` clears a nullable field, `None` leaves it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateResource {
    pub name: Option<String>,
    pub owner_id: Option<Option<Uuid>>,
    pub restricted: Option<bool>,
    pub public_zone: Option<bool>,
    pub department_id: Option<Option<Uuid>>,
    pub project_id: Option<Option<Uuid>>,
}
