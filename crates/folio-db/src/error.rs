//! Database-specific error types and conversions.

use folio_core::error::FolioError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Department hierarchy is cyclic at {0}")]
    CyclicDepartments(String),
}

impl From<DbError> for FolioError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FolioError::NotFound { entity, id },
            DbError::CyclicDepartments(id) => {
                FolioError::InvariantViolation(format!("department hierarchy is cyclic at {id}"))
            }
            other => FolioError::Database(other.to_string()),
        }
    }
}
