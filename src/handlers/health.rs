use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Response {
    let timestamp = state.clock.now().to_rfc3339();

    match state.store.probe.ping().await {
        Ok(()) => {
            tracing::trace!("health check ok");
            Json(json!({
                "status": "OK",
                "timestamp": timestamp,
                "database": "Connected",
            }))
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "ERROR",
                    "timestamp": timestamp,
                    "database": "Disconnected",
                })),
            )
                .into_response()
        }
    }
}
