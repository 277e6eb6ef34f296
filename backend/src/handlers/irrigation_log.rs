//! Irrigation log HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use shared::IrrigationLog;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::irrigation_log::{IrrigationLogInput, IrrigationLogService};
use crate::AppState;

pub async fn list_irrigation_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let service = IrrigationLogService::new(state.db.clone());
    let logs = service.list_logs(user.user_id, agrifield_id).await?;
    Ok(Json(json!({ "irrigation_logs": logs })))
}

pub async fn create_irrigation_log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
    Json(input): Json<IrrigationLogInput>,
) -> AppResult<(StatusCode, Json<IrrigationLog>)> {
    let service = IrrigationLogService::new(state.db.clone());
    let log = service.create_log(user.user_id, agrifield_id, input).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update_irrigation_log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((agrifield_id, log_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<IrrigationLogInput>,
) -> AppResult<Json<IrrigationLog>> {
    let service = IrrigationLogService::new(state.db.clone());
    let log = service
        .update_log(user.user_id, agrifield_id, log_id, input)
        .await?;
    Ok(Json(log))
}

pub async fn delete_irrigation_log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((agrifield_id, log_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let service = IrrigationLogService::new(state.db.clone());
    service.delete_log(user.user_id, agrifield_id, log_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
