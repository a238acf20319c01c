use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::errors::Result;
use crate::state::AppState;

/// Reject requests without a valid bearer token; on success the decoded
/// `Claims` are available to handlers as `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let claims = state.tokens.verify_header(header)?;
    tracing::debug!(user_id = claims.id, username = %claims.username, "authenticated request");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
