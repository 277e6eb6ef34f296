//! Agrifield HTTP handlers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Value};
use shared::Agrifield;
use uuid::Uuid;

use super::attachment;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::agrifield::{
    AgrifieldEditContext, AgrifieldService, CreateAgrifieldInput, UpdateAgrifieldInput,
};
use crate::AppState;

const SOIL_ANALYSIS_FIELD: &str = "soil_analysis";

fn service(state: &AppState) -> AgrifieldService {
    AgrifieldService::new(
        state.db.clone(),
        state.model_engine.clone(),
        state.config.data.media_dir.clone(),
    )
}

/// List the fields of a user
pub async fn list_agrifields(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<Value>> {
    let agrifields = service(&state).list_agrifields(user.user_id, &username).await?;
    Ok(Json(json!({ "agrifields": agrifields })))
}

/// Create a field for the user in the route
pub async fn create_agrifield(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
    Json(input): Json<CreateAgrifieldInput>,
) -> AppResult<(StatusCode, Json<Agrifield>)> {
    let agrifield = service(&state)
        .create_agrifield(user.user_id, &username, input)
        .await?;
    Ok((StatusCode::CREATED, Json(agrifield)))
}

pub async fn get_agrifield(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Json<Agrifield>> {
    Ok(Json(service(&state).get_agrifield(user.user_id, agrifield_id).await?))
}

pub async fn update_agrifield(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
    Json(input): Json<UpdateAgrifieldInput>,
) -> AppResult<Json<Agrifield>> {
    let agrifield = service(&state)
        .update_agrifield(user.user_id, agrifield_id, input)
        .await?;
    Ok(Json(agrifield))
}

pub async fn delete_agrifield(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    service(&state).delete_agrifield(user.user_id, agrifield_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Field plus owner and model defaults for the edit form
pub async fn get_edit_context(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Json<AgrifieldEditContext>> {
    let context = service(&state).get_edit_context(user.user_id, agrifield_id).await?;
    Ok(Json(context))
}

/// Upload a soil analysis document (multipart field `soil_analysis`)
pub async fn upload_soil_analysis(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Agrifield>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(SOIL_ANALYSIS_FIELD, e.body_text()))?
    {
        if field.name() != Some(SOIL_ANALYSIS_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation(SOIL_ANALYSIS_FIELD, "Missing file name"))?;
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(SOIL_ANALYSIS_FIELD, e.body_text()))?;

        let agrifield = service(&state)
            .store_soil_analysis(user.user_id, agrifield_id, &file_name, &content)
            .await?;
        return Ok(Json(agrifield));
    }

    Err(AppError::validation(SOIL_ANALYSIS_FIELD, "No file uploaded"))
}

pub async fn download_soil_analysis(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(agrifield_id): Path<Uuid>,
) -> AppResult<Response> {
    let file = service(&state).get_soil_analysis(user.user_id, agrifield_id).await?;
    attachment("application/octet-stream", &file.file_name, file.content)
}
