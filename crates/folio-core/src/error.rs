//! Error types for the folio system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Upstream unavailable: {upstream}")]
    UpstreamUnavailable { upstream: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Superseded by a newer request")]
    Superseded,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FolioError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn upstream(upstream: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            upstream: upstream.into(),
        }
    }

    /// Whether the error means a collaborator could not answer, as opposed
    /// to answering with a fact.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. } | Self::Database(_))
    }
}

pub type FolioResult<T> = Result<T, FolioError>;
