//! Account management shared by the three role tables.
//!
//! Each role's router injects its `Role` as an extension, so one set of
//! handlers serves admin, department and office accounts.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::dtos::auth_dtos::MessageResponse;
use crate::dtos::user_dtos::{
    AcademicYearRequest, CreateUserRequest, CreatedResponse, LockRequest, UpdateUserRequest,
    UserEnvelope, UserListResponse,
};
use crate::dtos::{AppJson, AppPath};
use crate::errors::{AppError, Result};
use crate::models::user::{NewUser, Role, UserResponse, UserUpdate};
use crate::state::AppState;

fn missing(role: Role) -> AppError {
    AppError::not_found(format!("{} not found", role.label()))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
) -> Result<Json<UserListResponse>> {
    let users = state
        .store
        .users
        .list(role)
        .await?
        .into_iter()
        .map(|u| UserResponse::from_user(u, role))
        .collect();

    Ok(Json(UserListResponse { success: true, users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<UserEnvelope>> {
    let user = state
        .store
        .users
        .find_by_id(role, id)
        .await?
        .ok_or_else(|| missing(role))?;

    Ok(Json(UserEnvelope {
        success: true,
        user: UserResponse::from_user(user, role),
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    req.validate()?;
    let fields = req.fields();
    if role == Role::Admin && fields.role.is_none() {
        return Err(AppError::invalid_data("All fields including password are required"));
    }

    if state
        .store
        .users
        .exists_with_username_or_email(role, &fields.username, &fields.email, None)
        .await?
    {
        return Err(AppError::Conflict("Username or Email already exists".to_string()));
    }

    let password_hash = state.hasher.hash(&req.password).await?;
    let id = state
        .store
        .users
        .insert(role, &NewUser { fields, password_hash })
        .await?;
    tracing::info!(role = %role, id, "account created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            message: format!("{} created successfully", role.label()),
            id,
        }),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;
    let fields = req.fields();
    if role == Role::Admin && fields.role.is_none() {
        return Err(AppError::invalid_data("All fields except password are required"));
    }

    // Existence first: MySQL reports zero affected rows for no-op updates.
    if state.store.users.find_by_id(role, id).await?.is_none() {
        return Err(missing(role));
    }
    if state
        .store
        .users
        .exists_with_username_or_email(role, &fields.username, &fields.email, Some(id))
        .await?
    {
        return Err(AppError::Conflict("Username or Email already exists".to_string()));
    }

    let password_hash = match req.new_password() {
        Some(password) => Some(state.hasher.hash(password).await?),
        None => None,
    };
    let rehashed = password_hash.is_some();
    state
        .store
        .users
        .update(role, id, &UserUpdate { fields, password_hash })
        .await?;
    tracing::info!(role = %role, id, rehashed, "account updated");

    Ok(Json(MessageResponse::ok(format!("{} updated successfully", role.label()))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.store.users.delete(role, id).await? {
        return Err(missing(role));
    }
    tracing::info!(role = %role, id, "account deleted");
    Ok(Json(MessageResponse::ok(format!("{} deleted successfully", role.label()))))
}

pub async fn set_lock(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<LockRequest>,
) -> Result<Json<Value>> {
    if !role.supports_lock() {
        return Err(AppError::invalid_data(format!("{} accounts cannot be locked", role.label())));
    }
    if state.store.users.find_by_id(role, id).await?.is_none() {
        return Err(missing(role));
    }

    state.store.users.set_locked(role, id, req.locked).await?;
    tracing::info!(role = %role, id, locked = req.locked, "account lock changed");

    let message = if req.locked { "Account locked" } else { "Account unlocked" };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "locked": req.locked,
    })))
}

pub async fn update_academic_year(
    State(state): State<AppState>,
    AppJson(req): AppJson<AcademicYearRequest>,
) -> Result<Json<MessageResponse>> {
    let year = req.new_academic_year.trim();
    if year.is_empty() {
        return Err(AppError::invalid_data("New academic year is required"));
    }

    state.store.users.set_academic_year_all(year).await?;
    tracing::info!(academic_year = year, "academic year propagated to all accounts");

    Ok(Json(MessageResponse::ok("Academic year updated for all users")))
}
