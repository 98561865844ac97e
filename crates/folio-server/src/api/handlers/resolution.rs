//! Resolve, folder listings and the panorama.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use folio_access::{Panorama, PanoramaForest, VisibleChildren};
use folio_core::error::FolioError;
use folio_core::models::grant::RoleResult;
use folio_core::models::role::Role;
use folio_core::repository::{GrantStore, MembershipProvider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::{AppState, View};

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resource_id: Uuid,
    /// Defaults to the caller.
    pub user_id: Option<Uuid>,
}

/// `POST /resolve`. The caller must be able to see the resource.
pub async fn resolve<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<ResolveRequest>,
) -> ApiResult<Json<RoleResult>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    let own = state
        .engine
        .authorize(caller.user_id, body.resource_id, Role::Viewer)
        .await?;

    match body.user_id {
        Some(user_id) if user_id != caller.user_id => {
            Ok(Json(state.engine.resolve(body.resource_id, user_id).await?))
        }
        _ => Ok(Json(own)),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChildrenQuery {
    pub parent_id: Uuid,
    pub user_id: Option<Uuid>,
}

/// `GET /visible-children`. Superseded by the caller's next listing.
pub async fn visible_children<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ChildrenQuery>,
) -> ApiResult<Json<VisibleChildren>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    let user_id = query.user_id.unwrap_or(caller.user_id);
    let engine = state.engine.clone();

    let listing = state
        .guard
        .guarded((caller.user_id, View::Listing), async move {
            if user_id != caller.user_id {
                engine
                    .authorize(caller.user_id, query.parent_id, Role::Viewer)
                    .await?;
            }
            engine.list_visible_children(query.parent_id, user_id).await
        })
        .await?;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
pub struct PanoramaQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PanoramaView {
    #[serde(flatten)]
    pub panorama: Panorama,
    pub forest: PanoramaForest,
}

/// `GET /panorama`. Another user's panorama is for super-admins only.
pub async fn panorama<G, M>(
    State(state): State<AppState<G, M>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<PanoramaQuery>,
) -> ApiResult<Json<PanoramaView>>
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    let user_id = query.user_id.unwrap_or(caller.user_id);
    if user_id != caller.user_id && !state.engine.is_super_admin(caller.user_id).await? {
        return Err(FolioError::forbidden(format!(
            "user {} may not view the panorama of {user_id}",
            caller.user_id
        ))
        .into());
    }

    let panorama = state
        .guard
        .guarded(
            (caller.user_id, View::Panorama),
            state.engine.build_panorama(user_id),
        )
        .await?;
    let forest = panorama.forest();
    Ok(Json(PanoramaView { panorama, forest }))
}
