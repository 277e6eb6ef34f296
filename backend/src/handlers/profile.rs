//! Profile HTTP handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{Profile, UserSummary};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::profile::{AccountDeletion, ProfileInput, ProfileService};
use crate::AppState;

const AJAX_HEADER: &str = "x-requested-with";
const AJAX_VALUE: &str = "XMLHttpRequest";

fn service(state: &AppState) -> ProfileService {
    ProfileService::new(state.db.clone(), state.config.data.media_dir.clone())
}

pub async fn create_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProfileInput>,
) -> AppResult<(StatusCode, Json<Profile>)> {
    let profile = service(&state).create_profile(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(profile_id): Path<Uuid>,
    Json(input): Json<ProfileInput>,
) -> AppResult<Json<Profile>> {
    let profile = service(&state)
        .update_profile(user.user_id, profile_id, input)
        .await?;
    Ok(Json(profile))
}

/// Delete the profile and the whole account behind it
pub async fn delete_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<AccountDeletion>> {
    let deletion = service(&state).delete_profile(user.user_id, profile_id).await?;
    Ok(Json(deletion))
}

/// Users selectable as supervisor in the profile form
pub async fn list_supervisor_candidates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(service(&state).get_supervisor_candidates(user.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveSupervisedForm {
    #[serde(default)]
    pub supervised_id: String,
}

/// AJAX endpoint used by the dashboard to drop a supervised farmer.
///
/// Routed for every method. Anything but an AJAX POST carrying a valid id is
/// answered with `NotFound`, whatever was wrong with it.
pub async fn remove_supervised(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    method: Method,
    headers: HeaderMap,
    form: Option<Form<RemoveSupervisedForm>>,
) -> AppResult<Json<Value>> {
    let profile_id = parse_supervised_id(&method, &headers, form.as_ref().map(|Form(f)| f))?;
    service(&state).remove_supervised(user.user_id, profile_id).await?;
    Ok(Json(json!({ "message": "Success!!!" })))
}

fn parse_supervised_id(
    method: &Method,
    headers: &HeaderMap,
    form: Option<&RemoveSupervisedForm>,
) -> AppResult<Uuid> {
    let is_ajax = headers
        .get(AJAX_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == AJAX_VALUE);
    if method != Method::POST || !is_ajax {
        return Err(AppError::NotFound("Page".to_string()));
    }

    form.and_then(|form| Uuid::parse_str(form.supervised_id.trim()).ok())
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, HeaderValue, Request},
        routing::any,
        Router,
    };
    use tower::ServiceExt;

    fn form(id: &str) -> RemoveSupervisedForm {
        RemoveSupervisedForm {
            supervised_id: id.to_string(),
        }
    }

    fn ajax_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AJAX_HEADER, HeaderValue::from_static(AJAX_VALUE));
        headers
    }

    /// Same extractors as `remove_supervised`, without the database
    fn extraction_router() -> Router {
        Router::new().route(
            "/supervised/remove",
            any(
                |method: Method, headers: HeaderMap, form: Option<Form<RemoveSupervisedForm>>| async move {
                    parse_supervised_id(&method, &headers, form.as_ref().map(|Form(f)| f))
                        .map(|_| StatusCode::NO_CONTENT)
                },
            ),
        )
    }

    fn status_of(request: Request<Body>) -> StatusCode {
        tokio_test::block_on(extraction_router().oneshot(request))
            .unwrap()
            .status()
    }

    #[test]
    fn test_missing_ajax_marker_is_not_found() {
        let id = Uuid::new_v4();
        let result = parse_supervised_id(&Method::POST, &HeaderMap::new(), Some(&form(&id.to_string())));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_malformed_or_missing_id_is_not_found() {
        let result = parse_supervised_id(&Method::POST, &ajax_headers(), Some(&form("42")));
        assert!(matches!(result, Err(AppError::NotFound(_))));
        let result = parse_supervised_id(&Method::POST, &ajax_headers(), None);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_non_post_is_not_found() {
        let id = Uuid::new_v4();
        let result = parse_supervised_id(&Method::GET, &ajax_headers(), Some(&form(&id.to_string())));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_ajax_request_yields_profile_id() {
        let id = Uuid::new_v4();
        let parsed = parse_supervised_id(&Method::POST, &ajax_headers(), Some(&form(&id.to_string())));
        assert_eq!(parsed.unwrap(), id);
    }

    #[test]
    fn test_every_malformed_request_answers_not_found() {
        let id = Uuid::new_v4();
        let requests = [
            Request::get(format!("/supervised/remove?supervised_id={}", id))
                .header(AJAX_HEADER, AJAX_VALUE)
                .body(Body::empty())
                .unwrap(),
            Request::post("/supervised/remove")
                .header(AJAX_HEADER, AJAX_VALUE)
                .body(Body::from(format!("supervised_id={}", id)))
                .unwrap(),
            Request::post("/supervised/remove")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(r#"{{"supervised_id":"{}"}}"#, id)))
                .unwrap(),
            Request::delete("/supervised/remove")
                .header(AJAX_HEADER, AJAX_VALUE)
                .body(Body::empty())
                .unwrap(),
        ];
        for request in requests {
            assert_eq!(status_of(request), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_well_formed_ajax_post_passes_extraction() {
        let request = Request::post("/supervised/remove")
            .header(AJAX_HEADER, AJAX_VALUE)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("supervised_id={}", Uuid::new_v4())))
            .unwrap();
        assert_eq!(status_of(request), StatusCode::NO_CONTENT);
    }
}
