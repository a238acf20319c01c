use axum::{extract::State, response::Json, Extension};
use serde_json::{json, Value};
use validator::Validate;

use crate::dtos::auth_dtos::{LoginRequest, LoginResponse, LoginUser};
use crate::dtos::AppJson;
use crate::errors::{AppError, Result};
use crate::models::user::{Claims, Role, User};
use crate::state::AppState;

async fn find_login_account(state: &AppState, username: &str, role: Option<Role>) -> Result<Option<(Role, User)>> {
    let candidates = match role {
        Some(role) => vec![role],
        None => Role::SEARCH_ORDER.to_vec(),
    };
    for role in candidates {
        if let Some(user) = state.store.users.find_by_username(role, username).await? {
            return Ok(Some((role, user)));
        }
    }
    Ok(None)
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    payload.validate()?;
    let username = payload.username.trim();

    let (role, user) = find_login_account(&state, username, payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("No account found"))?;

    // Lock state is reported before the password is checked.
    if user.is_locked() {
        tracing::warn!(user_id = user.id, "login refused for locked account");
        return Err(AppError::Forbidden("Account locked by administrator".to_string()));
    }

    if !state.hasher.verify(&payload.password, &user.password_hash).await {
        tracing::info!(role = %role, username, "login failed: wrong password");
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    let token = state.tokens.issue(user.id, &user.username)?;
    tracing::info!(role = %role, user_id = user.id, "login successful");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: LoginUser::new(user, role),
    }))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": claims,
    }))
}
