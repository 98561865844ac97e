//! Resolution cache scoped to a single listing.
//!
//! Keys include the resource revision, so a resource updated mid-listing
//! is never answered from a stale entry. A cache is created per operation
//! and dropped with it; nothing outlives the request.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use folio_core::models::grant::RoleResult;
use folio_core::models::resource::Resource;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    resource_id: Uuid,
    user_id: Uuid,
    revision: u64,
}

impl CacheKey {
    fn of(resource: &Resource, user_id: Uuid) -> Self {
        Self {
            resource_id: resource.id,
            user_id,
            revision: resource.revision,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<CacheKey, RoleResult>>,
}

impl ResolutionCache {
    pub fn get(&self, resource: &Resource, user_id: Uuid) -> Option<RoleResult> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&CacheKey::of(resource, user_id))
            .cloned()
    }

    /// Degraded results are not stored; a later lookup gets another chance.
    pub fn insert(&self, resource: &Resource, user_id: Uuid, result: &RoleResult) {
        if result.is_degraded() {
            return;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(CacheKey::of(resource, user_id), result.clone());
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
