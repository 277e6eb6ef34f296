//! Route definitions for the Aira irrigation advisory API

use axum::{
    middleware,
    routing::{any, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Raster coverage dates for the landing page (public)
        .route("/data-range", get(handlers::data_range))
        // Protected routes
        .merge(protected_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/demo", post(handlers::demo_login))
}

/// Everything behind the bearer token
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/home", get(handlers::home))
        .route("/home/:username", get(handlers::home_for_user))
        .route(
            "/users/:username/agrifields",
            get(handlers::list_agrifields).post(handlers::create_agrifield),
        )
        .nest("/agrifields", agrifield_routes())
        .nest("/profiles", profile_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Agrifield routes (protected)
fn agrifield_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            get(handlers::get_agrifield)
                .put(handlers::update_agrifield)
                .delete(handlers::delete_agrifield),
        )
        .route("/:id/edit-context", get(handlers::get_edit_context))
        .route("/:id/advice", get(handlers::advice))
        .route("/:id/performance", get(handlers::get_performance))
        .route("/:id/performance/csv", get(handlers::export_performance_csv))
        .route("/:id/timeseries/:variable", get(handlers::download_timeseries))
        .route(
            "/:id/soil-analysis",
            get(handlers::download_soil_analysis).put(handlers::upload_soil_analysis),
        )
        .route(
            "/:id/irrigation-logs",
            get(handlers::list_irrigation_logs).post(handlers::create_irrigation_log),
        )
        .route(
            "/:id/irrigation-logs/:log_id",
            put(handlers::update_irrigation_log).delete(handlers::delete_irrigation_log),
        )
}

/// Profile routes (protected)
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_profile))
        .route("/supervisor-candidates", get(handlers::list_supervisor_candidates))
        .route("/supervised/remove", any(handlers::remove_supervised))
        .route(
            "/:id",
            put(handlers::update_profile).delete(handlers::delete_profile),
        )
}
