//! Engine error types.

use folio_core::error::FolioError;
use folio_core::models::grant::Lookup;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("request superseded by a newer one for the same view")]
    Superseded,

    #[error("cycle in parent chain at resource {resource_id}")]
    CycleDetected { resource_id: Uuid },

    #[error("parent chain of resource {resource_id} exceeds {max_depth} levels")]
    DepthExceeded { resource_id: Uuid, max_depth: usize },

    #[error("document {resource_id} has children")]
    DocumentWithChildren { resource_id: Uuid },

    #[error("resource {child_id} listed under {parent_id} but points at another parent")]
    ParentMismatch { child_id: Uuid, parent_id: Uuid },

    #[error("department hierarchy is cyclic at {department_id}")]
    DepartmentCycle { department_id: Uuid },

    #[error("{} lookup timed out", lookup.as_str())]
    Timeout { lookup: Lookup },

    #[error("user {user_id} is not an admin of resource {resource_id}")]
    NotAdmin { user_id: Uuid, resource_id: Uuid },
}

impl From<AccessError> for FolioError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Superseded => FolioError::Superseded,
            AccessError::CycleDetected { .. }
            | AccessError::DepthExceeded { .. }
            | AccessError::DocumentWithChildren { .. }
            | AccessError::ParentMismatch { .. }
            | AccessError::DepartmentCycle { .. } => {
                FolioError::InvariantViolation(err.to_string())
            }
            AccessError::Timeout { .. } => FolioError::UpstreamUnavailable {
                upstream: err.to_string(),
            },
            AccessError::NotAdmin { .. } => FolioError::Forbidden {
                reason: err.to_string(),
            },
        }
    }
}
