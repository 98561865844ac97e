//! Domain models for folio.
//!
//! These are the core types shared across all crates.

pub mod grant;
pub mod membership;
pub mod resource;
pub mod role;
pub mod share;
