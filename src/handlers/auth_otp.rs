use axum::{extract::State, response::Json};

use crate::dtos::auth_dtos::{
    ForgotPasswordRequest, ForgotPasswordResponse, MessageResponse, ResetPasswordRequest,
    VerifyOtpRequest,
};
use crate::dtos::AppJson;
use crate::errors::Result;
use crate::state::AppState;

/// Issue a reset code. Answers as soon as the code is stored; the email
/// goes out from the notification worker.
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>> {
    let reset = state.otp.request_reset(&req.email).await?;

    let message = if reset.otp_for_testing.is_some() {
        "Email service not configured. Use the code below for testing."
    } else {
        "Reset code generated. Check your email shortly."
    };

    Ok(Json(ForgotPasswordResponse {
        success: true,
        message: message.to_string(),
        reset,
    }))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>> {
    state.otp.verify_otp(&req.email, &req.otp).await?;
    Ok(Json(MessageResponse::ok("OTP verified successfully")))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .otp
        .reset_password(&req.email, &req.otp, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::ok("Password reset successfully.")))
}
