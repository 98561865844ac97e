//! Server configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use folio_access::AccessConfig;
use folio_db::DbConfig;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listener address (`FOLIO_BIND_ADDRESS`, default `0.0.0.0:8080`).
    pub bind_address: String,
    pub db: DbConfig,
    /// PEM-encoded Ed25519 key that verifies bearer tokens.
    pub jwt_public_key_pem: String,
    pub jwt_issuer: String,
    pub access: AccessConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let required =
            |key: &str| var(key).ok_or_else(|| ApiError::Config(format!("{key} not set")));

        let db_defaults = DbConfig::default();
        let credentials = match (var("FOLIO_DB_USERNAME"), var("FOLIO_DB_PASSWORD")) {
            (Some(username), Some(password)) => Some((username, password)),
            (None, None) => db_defaults.credentials,
            _ => {
                return Err(ApiError::Config(
                    "FOLIO_DB_USERNAME and FOLIO_DB_PASSWORD must be set together".into(),
                ));
            }
        };

        let access_defaults = AccessConfig::default();
        let upstream_timeout = match var("FOLIO_UPSTREAM_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse("FOLIO_UPSTREAM_TIMEOUT_MS", &raw)?),
            None => access_defaults.upstream_timeout,
        };
        let fanout_limit = match var("FOLIO_FANOUT_LIMIT") {
            Some(raw) => parse("FOLIO_FANOUT_LIMIT", &raw)?,
            None => access_defaults.fanout_limit,
        };
        if fanout_limit == 0 {
            return Err(ApiError::Config("FOLIO_FANOUT_LIMIT must be positive".into()));
        }

        Ok(Self {
            bind_address: var("FOLIO_BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".into()),
            db: DbConfig {
                url: var("FOLIO_DB_URL").unwrap_or(db_defaults.url),
                namespace: var("FOLIO_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
                database: var("FOLIO_DB_DATABASE").unwrap_or(db_defaults.database),
                credentials,
            },
            jwt_public_key_pem: required("FOLIO_JWT_PUBLIC_KEY_PEM")?,
            jwt_issuer: required("FOLIO_JWT_ISSUER")?,
            access: AccessConfig {
                upstream_timeout,
                fanout_limit,
                ..access_defaults
            },
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> ApiResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("{key} is not a valid number: {raw}")))
}
