//! SurrealDB implementations of the `folio-core` data-access traits.

mod grant_store;
mod membership;

pub use grant_store::SurrealGrantStore;
pub use membership::SurrealMembershipProvider;

use uuid::Uuid;

use crate::error::DbError;

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

fn parse_opt_uuid(field: &str, raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|r| parse_uuid(field, &r)).transpose()
}

fn ids_to_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}
