use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::handlers::{health, maintenance};
use crate::middleware::{
    auth::require_auth, error_details::expose_error_details, maintenance::maintenance_gate,
};
use crate::state::AppState;

pub mod auth;
pub mod users;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route not found")
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub fn build_router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.clone(), require_auth);

    let protected = Router::new()
        .nest("/api/auth", auth::protected_routes())
        .nest("/api/admin", users::admin_routes())
        .nest("/api/department-user", users::department_routes())
        .nest("/api/office-user", users::office_routes())
        .route_layer(auth_layer.clone());

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/admin/maintenance",
            get(maintenance::get_status)
                .merge(post(maintenance::set_status).route_layer(auth_layer)),
        )
        .nest("/api", auth::routes())
        .nest("/api/auth", auth::routes())
        .merge(protected)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), expose_error_details))
        .layer(middleware::from_fn_with_state(state.clone(), maintenance_gate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
