use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::maintenance::is_exempt;
use crate::state::AppState;

pub async fn maintenance_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let status = state.maintenance.status().await;
    if status.enabled {
        tracing::debug!(path = %request.uri().path(), "blocked by maintenance mode");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "maintenance": true,
                "message": status.display_message(),
            })),
        )
            .into_response();
    }

    next.run(request).await
}
