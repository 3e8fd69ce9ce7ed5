use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use itrack_core::domain::{Incident, Severity, Status, KNOWN_SERVICES};
use itrack_core::error::AppError;
use itrack_core::query::{ListParams, SortKey};
use itrack_core::repo::IncidentPage;
use itrack_core::store::Store;
use itrack_core::validate::as_object;
use serde::Serialize;
use serde_json::Value;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};

/// Run blocking store work off the async executor.
async fn with_store<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, AppError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| {
            AppError::storage("TASK_JOIN_FAILED", "Store task failed").with_details(e.to_string())
        })?
        .map_err(ApiError::from)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> ApiResult<serde_json::Map<String, Value>> {
    let Json(value) = body.map_err(|e| {
        AppError::validation(vec!["Request body must be a JSON object.".to_string()])
            .with_details(e.body_text())
    })?;
    Ok(as_object(&value)?.clone())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub severities: Vec<Severity>,
    pub statuses: Vec<Status>,
    pub services: Vec<&'static str>,
    pub sort_fields: Vec<SortKey>,
}

/// Enumerations the UI needs for its filter and form controls
pub async fn meta() -> Json<MetaResponse> {
    Json(MetaResponse {
        severities: Severity::ALL.to_vec(),
        statuses: Status::ALL.to_vec(),
        services: KNOWN_SERVICES.to_vec(),
        sort_fields: SortKey::ALL.to_vec(),
    })
}

/// Create an incident
pub async fn create_incident(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Incident>)> {
    let payload = json_body(body)?;
    let created = with_store(&state, move |store| store.create_incident(&payload)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List incidents with filtering, sorting and pagination
pub async fn list_incidents(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<IncidentPage>> {
    let Query(params) = params.map_err(|e| {
        AppError::validation(vec!["Query string is malformed.".to_string()])
            .with_details(e.body_text())
    })?;
    let page = with_store(&state, move |store| store.list_incidents(&params)).await?;
    Ok(Json(page))
}

/// Get an incident by ID
pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Incident>> {
    let incident = with_store(&state, move |store| store.get_incident(&id)).await?;
    Ok(Json(incident))
}

/// Partially update an incident
pub async fn update_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Incident>> {
    // An unknown id is reported before body problems.
    let payload = match json_body(body) {
        Ok(payload) => payload,
        Err(err) => {
            let probe = id.clone();
            with_store(&state, move |store| store.get_incident(&probe)).await?;
            return Err(err);
        }
    };
    let updated = with_store(&state, move |store| store.update_incident(&id, &payload)).await?;
    Ok(Json(updated))
}
