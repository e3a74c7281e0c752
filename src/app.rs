use crate::handlers::{self, AppState};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Request size limit: 1MB max payload.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Account and lookup endpoints, without state or shared layers.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/create-account-teacher", post(handlers::create_teacher))
        .route("/api/create-account-student", post(handlers::create_student))
        .route("/api/create-account-parent", post(handlers::create_parent))
        .route("/api/academic-years", get(handlers::academic_years))
}

/// Adds the health check, state, tracing and CORS around `routes`.
pub fn with_shared_layers(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(crate::parent_links::SESSION_HEADER),
        ]);

    Router::new()
        .route("/health", get(handlers::health))
        .merge(routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Full application router minus rate limiting, which needs peer addresses.
pub fn build_router(state: Arc<AppState>) -> Router {
    with_shared_layers(
        api_routes().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        state,
    )
}
