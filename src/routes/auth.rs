use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, auth_otp};
use crate::state::AppState;

/// Login and self-service reset. Mounted at both `/api` and `/api/auth`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth_otp::forgot_password))
        .route("/verify-otp", post(auth_otp::verify_otp))
        .route("/reset-password", post(auth_otp::reset_password))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(auth::me))
}
