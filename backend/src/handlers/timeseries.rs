//! Point time-series download

use axum::{
    extract::{Path, State},
    response::Response,
};
use shared::TimeseriesVariable;
use uuid::Uuid;

use super::attachment;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::{AccessService, TimeseriesCache};
use crate::AppState;

/// Sampled series of a weather variable at the field's location
pub async fn download_timeseries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((agrifield_id, variable)): Path<(Uuid, String)>,
) -> AppResult<Response> {
    let agrifield = AccessService::new(state.db.clone())
        .authorized_agrifield(user.user_id, agrifield_id)
        .await?;
    let variable: TimeseriesVariable = variable
        .parse()
        .map_err(|_| AppError::NotFound("Time series".to_string()))?;

    let data = &state.config.data;
    let cache = TimeseriesCache::new(
        data.timeseries_cache_dir.clone(),
        data.historical_dir.clone(),
        data.timeseries_cache_version,
        state.raster.clone(),
    );
    let path = cache.get_cached(&agrifield, &variable).await?;
    let content = tokio::fs::read(&path).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.hts", variable));
    attachment("text/csv", &file_name, content)
}
