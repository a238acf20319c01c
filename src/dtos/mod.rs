use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

pub mod auth_dtos;
pub mod user_dtos;

/// `axum::Json` with rejections reported through `AppError`, so malformed
/// bodies get the same envelope as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Path` with the same envelope for unparsable segments.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
