pub mod candidate_routes;
pub mod extract;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{require_candidate, require_staff};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let staff_api = Router::new()
        .route(
            "/api/candidates",
            get(candidate_routes::list_candidates).post(candidate_routes::create_candidate),
        )
        .route(
            "/api/candidates/:id",
            get(candidate_routes::get_candidate)
                .put(candidate_routes::update_candidate)
                .patch(candidate_routes::update_candidate)
                .delete(candidate_routes::delete_candidate),
        )
        .route("/api/connect", post(candidate_routes::connect_candidate))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_staff));

    let profile_api = Router::new()
        .route(
            "/api/candidate-profile",
            get(candidate_routes::get_own_profile).put(candidate_routes::update_own_profile),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_candidate));

    base_routes
        .merge(staff_api)
        .merge(profile_api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
