//! Route definitions for the API.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use folio_core::repository::{GrantStore, MembershipProvider};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::auth::require_caller;
use crate::state::AppState;

/// Build the router. Everything except `/health` requires a bearer token.
pub fn create_router<G, M>(state: AppState<G, M>) -> Router
where
    G: GrantStore + 'static,
    M: MembershipProvider + 'static,
{
    let authenticated = Router::new()
        .route("/resolve", post(handlers::resolution::resolve::<G, M>))
        .route(
            "/visible-children",
            get(handlers::resolution::visible_children::<G, M>),
        )
        .route("/panorama", get(handlers::resolution::panorama::<G, M>))
        .route("/share", post(handlers::shares::create_share::<G, M>))
        .route(
            "/share/:share_id",
            put(handlers::shares::update_share::<G, M>)
                .delete(handlers::shares::revoke_share::<G, M>),
        )
        .route(
            "/resources/:resource_id/members",
            get(handlers::shares::list_members::<G, M>),
        )
        .route(
            "/shared-with-me",
            get(handlers::shares::shared_with_me::<G, M>),
        )
        .route(
            "/users/:user_id/shares",
            get(handlers::shares::share_history::<G, M>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_caller::<G, M>,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check::<G, M>))
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
