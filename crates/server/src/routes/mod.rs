use axum::{Router, middleware};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, auth};

pub mod companies;
pub mod invites;
pub mod notifications;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(companies::router())
        .merge(invites::router())
        .merge(notifications::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_principal,
        ));

    Router::new()
        .nest("/api", invites::public_router().merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
