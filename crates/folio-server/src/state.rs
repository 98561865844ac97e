//! Shared application state.

use std::sync::Arc;

use folio_access::{AccessConfig, AccessService, ConsistencyGuard};
use folio_core::repository::{GrantStore, MembershipProvider};
use folio_db::repository::{SurrealGrantStore, SurrealMembershipProvider};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use uuid::Uuid;

use crate::auth::TokenVerifier;

pub type Engine<G = SurrealGrantStore<Any>, M = SurrealMembershipProvider<Any>> = AccessService<G, M>;

/// A view whose requests are sequenced per caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Listing,
    Panorama,
}

pub struct AppState<G = SurrealGrantStore<Any>, M = SurrealMembershipProvider<Any>>
where
    G: GrantStore,
    M: MembershipProvider,
{
    pub engine: Arc<Engine<G, M>>,
    pub db: Surreal<Any>,
    pub verifier: Arc<TokenVerifier>,
    /// A newer request from the same caller for the same view supersedes
    /// one still in flight.
    pub guard: Arc<ConsistencyGuard<(Uuid, View)>>,
}

impl<G: GrantStore, M: MembershipProvider> Clone for AppState<G, M> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            db: self.db.clone(),
            verifier: self.verifier.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl AppState {
    pub fn new(db: Surreal<Any>, access: AccessConfig, verifier: TokenVerifier) -> Self {
        let engine = AccessService::new(
            SurrealGrantStore::new(db.clone()),
            SurrealMembershipProvider::new(db.clone()),
            access,
        );
        Self::with_engine(engine, db, verifier)
    }
}

impl<G: GrantStore, M: MembershipProvider> AppState<G, M> {
    /// State over an already assembled engine. `db` only backs the health
    /// check.
    pub fn with_engine(engine: Engine<G, M>, db: Surreal<Any>, verifier: TokenVerifier) -> Self {
        Self {
            engine: Arc::new(engine),
            db,
            verifier: Arc::new(verifier),
            guard: Arc::new(ConsistencyGuard::new()),
        }
    }
}
