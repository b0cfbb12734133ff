use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use flow_sdk::{DocumentId, FlowDb, FlowError, SearchRequest, SortOrder, StreamDefinition, StreamName};

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<FlowDb>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationBody {
    pub data_streams: Vec<StreamDefinition>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub order: Option<String>,
    pub limit: Option<usize>,
}

/// Run a database call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&FlowDb) -> Result<T, FlowError> + Send + 'static,
{
    let db = Arc::clone(&state.db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| ApiError::Internal(format!("database task failed: {e}")))?
        .map_err(ApiError::from)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(rejection.body_text()),
            _ => ApiError::BadRequest(rejection.body_text()),
        })
}

/// Respond with stored documents as one JSON array without re-encoding them.
fn raw_array(documents: Vec<Vec<u8>>) -> Response {
    let mut body = Vec::with_capacity(documents.iter().map(|d| d.len() + 1).sum::<usize>() + 2);
    body.push(b'[');
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            body.push(b',');
        }
        body.extend_from_slice(doc);
    }
    body.push(b']');
    raw_json(body)
}

fn raw_json(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "UP"}))
}

pub async fn set_configuration_handler(
    State(state): State<AppState>,
    body: Result<Json<ConfigurationBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let body = json_body(body)?;
    blocking(&state, move |db| db.set_configuration(body.data_streams)).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn current_configuration_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<StreamName>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.current_configuration()).await?))
}

pub async fn append_documents_handler(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    body: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let documents = json_body(body)?;
    let ids = blocking(&state, move |db| db.append_documents(&stream, documents)).await?;
    Ok((StatusCode::CREATED, Json(json!({"ids": ids}))))
}

pub async fn get_document_handler(
    State(state): State<AppState>,
    Path((stream, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id: DocumentId = id.parse().map_err(FlowError::from)?;
    let raw = blocking(&state, move |db| db.get_document(&stream, id)).await?;
    Ok(raw_json(raw))
}

pub async fn get_schema_handler(
    State(state): State<AppState>,
    Path(stream): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.get_schema(&stream)).await?))
}

pub async fn recent_handler(
    State(state): State<AppState>,
    Path(stream): Path<String>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|r| ApiError::BadRequest(r.body_text()))?;
    let order = match params.order.as_deref() {
        Some(order) => order.parse::<SortOrder>().map_err(FlowError::from)?,
        None => SortOrder::Descending,
    };
    let documents =
        blocking(&state, move |db| db.recent(&stream, order, params.limit)).await?;
    Ok(raw_array(documents))
}

pub async fn search_handler(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(body)?;
    let documents = blocking(&state, move |db| db.search(&request)).await?;
    Ok(raw_array(documents))
}
