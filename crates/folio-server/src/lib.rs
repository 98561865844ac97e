//! folio server: the HTTP surface of the access-resolution engine.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use api::routes::create_router;
pub use auth::{Caller, TokenVerifier};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::{AppState, Engine, View};
