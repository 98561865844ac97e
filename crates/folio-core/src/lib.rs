//! folio core: shared domain models, the closed role enumerations, the
//! error taxonomy and the data-access traits every other crate builds on.

pub mod error;
pub mod models;
pub mod repository;
