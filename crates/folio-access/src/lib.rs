//! folio access: resolves what a user may do with a resource.
//!
//! [`AccessService`] combines the grant store and the membership provider
//! into effective roles for single resources, folder listings, the
//! per-user panorama and per-resource member rosters. It also owns the
//! share mutations, since those are gated on the caller's own role.

pub mod ancestry;
pub mod cache;
pub mod config;
pub mod context;
pub mod department;
pub mod error;
pub mod guard;
pub mod members;
pub mod panorama;
pub mod resolver;
pub mod service;
pub mod shares;
pub mod upstream;
pub mod visibility;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::AccessConfig;
pub use error::AccessError;
pub use guard::{ConsistencyGuard, Ticket};
pub use members::{Member, MemberRoster};
pub use panorama::{AncestorRef, ForestNode, Panorama, PanoramaEntry, PanoramaForest};
pub use service::AccessService;
pub use shares::{ShareDirection, ShareHistory, ShareHistoryEntry, SharedItem, SharedWithMe};
pub use visibility::{VisibleChild, VisibleChildren};
