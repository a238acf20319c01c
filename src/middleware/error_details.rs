use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::errors::ErrorDetail;
use crate::state::AppState;

/// Outside production, server errors carry their cause in `error`.
pub async fn expose_error_details(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if state.config.is_production() {
        return response;
    }

    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    (
        response.status(),
        Json(json!({
            "success": false,
            "message": detail.message,
            "error": detail.cause,
        })),
    )
        .into_response()
}
