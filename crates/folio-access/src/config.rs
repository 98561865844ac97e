//! Engine configuration.

use std::time::Duration;

/// Configuration for the access service.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Upper bound on every grant store and membership provider call
    /// (default: 2 seconds). A call that runs out of time contributes no
    /// grant.
    pub upstream_timeout: Duration,
    /// Maximum number of child resolutions in flight at once (default: 16).
    pub fanout_limit: usize,
    /// Maximum length of a parent chain or department lineage
    /// (default: 64).
    pub max_depth: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(2),
            fanout_limit: 16,
            max_depth: 64,
        }
    }
}
