//! Irrigation performance handlers

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use super::attachment;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::performance::{PerformanceService, PerformanceView};
use crate::AppState;

/// Performance summary and chart series
pub async fn get_performance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Json<PerformanceView>> {
    let service = PerformanceService::new(state.db.clone(), state.model_engine.clone());
    Ok(Json(service.report(user.user_id, agrifield_id).await?))
}

/// Performance series as a CSV download
pub async fn export_performance_csv(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Response> {
    let service = PerformanceService::new(state.db.clone(), state.model_engine.clone());
    let export = service.export_csv(user.user_id, agrifield_id).await?;
    attachment("text/csv", &export.file_name, export.content)
}
