use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use folio_core::repository::{GrantStore, MembershipProvider};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a database round trip.
pub async fn health_check<G, M>(State(state): State<AppState<G, M>>) -> impl IntoResponse
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    match state.db.query("RETURN true").await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "message": "database unreachable",
                })),
            )
        }
    }
}
