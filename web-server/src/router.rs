//! Router construction: public routes, JWT-protected routes, shared layers.

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::jwt::jwt_auth;
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Routes that require a bearer token
    let protected = Router::new()
        .route("/api/v1/experiment/info", get(handlers::experiment::info))
        .route(
            "/api/v1/experiment/progress",
            post(handlers::experiment::update_progress),
        )
        .route(
            "/api/v1/goals/basic_info",
            get(handlers::goals::basic_info).post(handlers::goals::replace_goals),
        )
        .route("/api/v1/goals/detail", get(handlers::goals::detail))
        .route(
            "/api/v1/goals/sub_goals",
            post(handlers::goals::update_sub_goals),
        )
        .route(
            "/api/v1/goals/sub_tasks",
            post(handlers::goals::update_sub_tasks),
        )
        .route(
            "/api/v1/goals/sub_task_status",
            post(handlers::goals::update_sub_task_status),
        )
        .route(
            "/api/v1/insurance_list",
            get(handlers::policies::get_list).post(handlers::policies::replace),
        )
        .route("/api/v1/insurance_list/add", post(handlers::policies::add))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(state.signer.clone()));

    // Public routes (no auth)
    let public = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/v1/insurance/product_types",
            get(handlers::products::product_types),
        )
        .route(
            "/api/v1/insurance/product_fields",
            get(handlers::products::product_fields),
        )
        .route("/api/v1/insurance/search", get(handlers::products::search))
        .route(
            "/api/v1/insurance/product_info",
            get(handlers::products::product_info),
        )
        .route("/api/v1/medical/info", get(handlers::reference::medical_info))
        .route("/api/v1/pension/info", get(handlers::reference::pension_info))
        .route("/api/v1/login", post(handlers::auth::login))
        .route("/api/v1/register", post(handlers::auth::register))
        .route("/api/v1/reset_password", post(handlers::auth::reset_password));

    public
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
