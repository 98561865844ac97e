//! Share mutations, share views and member rosters.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use folio_access::{MemberRoster, ShareHistory, SharedWithMe};
use folio_core::error::FolioError;
use folio_core::models::role::Role;
use folio_core::models::share::Share;
use folio_core::repository::{GrantStore, MembershipProvider};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    pub resource_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShareRequest {
    pub role: Role,
}

/// `POST /share`
pub async fn create_share<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<CreateShareRequest>,
) -> ApiResult<(StatusCode, Json<Share>)>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    let share = state
        .engine
        .share(caller.user_id, body.resource_id, body.user_id, body.role)
        .await?;
    Ok((StatusCode::CREATED, Json(share)))
}

/// `PUT /share/:share_id`
pub async fn update_share<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Path(share_id): Path<Uuid>,
    Json(body): Json<UpdateShareRequest>,
) -> ApiResult<Json<Share>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    let share = state
        .engine
        .update_share(caller.user_id, share_id, body.role)
        .await?;
    Ok(Json(share))
}

/// `DELETE /share/:share_id`
pub async fn revoke_share<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Path(share_id): Path<Uuid>,
) -> ApiResult<StatusCode>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    state.engine.revoke_share(caller.user_id, share_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /resources/:resource_id/members`
pub async fn list_members<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Path(resource_id): Path<Uuid>,
) -> ApiResult<Json<MemberRoster>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    state
        .engine
        .authorize(caller.user_id, resource_id, Role::Viewer)
        .await?;
    Ok(Json(state.engine.list_members(resource_id).await?))
}

/// `GET /shared-with-me`
pub async fn shared_with_me<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<SharedWithMe>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    Ok(Json(state.engine.shared_with_me(caller.user_id).await?))
}

/// `GET /users/:user_id/shares`
pub async fn share_history<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ShareHistory>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    if user_id != caller.user_id && !state.engine.is_super_admin(caller.user_id).await? {
        return Err(FolioError::forbidden(format!(
            "user {} may not view the share history of {user_id}",
            caller.user_id
        ))
        .into());
    }
    Ok(Json(state.engine.share_history(user_id).await?))
}
