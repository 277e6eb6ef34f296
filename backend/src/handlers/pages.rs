//! Dashboard, advice and landing page data

use axum::{
    extract::{Path, State},
    Json,
};
use shared::TimeseriesVariable;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::home::{AdviceView, HomeService, HomeView};
use crate::services::timeseries::{raster_date_range, DataRangeView, DATA_RANGE_VARIABLE};
use crate::services::ProfileService;
use crate::AppState;

fn home_service(state: &AppState) -> HomeService {
    HomeService::new(
        state.db.clone(),
        state.model_engine.clone(),
        ProfileService::new(state.db.clone(), state.config.data.media_dir.clone()),
    )
}

/// The requester's own dashboard
pub async fn home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<HomeView>> {
    let view = home_service(&state)
        .home(user.user_id, &user.username, None)
        .await?;
    Ok(Json(view))
}

/// Dashboard of another user, for their supervisor
pub async fn home_for_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<HomeView>> {
    let view = home_service(&state)
        .home(user.user_id, &user.username, Some(&username))
        .await?;
    Ok(Json(view))
}

pub async fn advice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Json<AdviceView>> {
    Ok(Json(home_service(&state).advice(user.user_id, agrifield_id).await?))
}

/// Dates covered by the historical rasters
pub async fn data_range(State(state): State<AppState>) -> AppResult<Json<DataRangeView>> {
    let rain: TimeseriesVariable = DATA_RANGE_VARIABLE
        .parse()
        .map_err(|e: shared::InvalidVariable| AppError::Internal(e.to_string()))?;
    let range = raster_date_range(&state.config.data.historical_dir, &rain).await?;
    Ok(Json(range.into()))
}
