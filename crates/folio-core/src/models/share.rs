//! Explicit share domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// Namespace for deriving share ids from `(resource_id, user_id)`.
const SHARE_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_4d2e_93b0_4c5a_8e71_2f0d_c3b9_a640);

/// A direct `(resource, user, role)` grant. At most one exists per
/// `(resource_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Share {
    /// Stable share id for a `(resource, user)` pair, so an upsert always
    /// lands on the same row.
    pub fn key(resource_id: Uuid, user_id: Uuid) -> Uuid {
        let mut name = [0u8; 32];
        name[..16].copy_from_slice(resource_id.as_bytes());
        name[16..].copy_from_slice(user_id.as_bytes());
        Uuid::new_v5(&SHARE_NAMESPACE, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_key_is_stable_and_pair_specific() {
        let r = Uuid::new_v4();
        let u = Uuid::new_v4();
        assert_eq!(Share::key(r, u), Share::key(r, u));
        assert_ne!(Share::key(r, u), Share::key(u, r));
    }
}
