use axum::{extract::State, response::Json};

use crate::dtos::user_dtos::{MaintenanceRequest, MaintenanceResponse};
use crate::dtos::AppJson;
use crate::errors::Result;
use crate::state::AppState;

/// Reads storage directly so the answer is never stale.
pub async fn get_status(State(state): State<AppState>) -> Result<Json<MaintenanceResponse>> {
    let maintenance = state.maintenance.load().await?;
    Ok(Json(MaintenanceResponse {
        success: true,
        maintenance,
    }))
}

pub async fn set_status(
    State(state): State<AppState>,
    AppJson(req): AppJson<MaintenanceRequest>,
) -> Result<Json<MaintenanceResponse>> {
    let maintenance = state.maintenance.set(req.enabled(), req.message()).await?;
    Ok(Json(MaintenanceResponse {
        success: true,
        maintenance,
    }))
}
