use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde_json::{json, Value};

use super::authenticate;
use crate::database::entities::datasets;
use crate::errors::{AppError, AppResult};
use crate::server::app::AppState;
use crate::services::DatasetService;

/// POST /api/files/upload — multipart body with one `file` field.
pub async fn upload_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let principal = authenticate(&state, &headers).await?;

    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(format!("invalid multipart body: {err}")))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|name| name.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::Validation(format!("invalid multipart body: {err}")))?;
            file_bytes = Some(bytes.to_vec());
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::Validation("no file uploaded".to_string()))?;
    let name = file_name.unwrap_or_else(|| "upload".to_string());

    let service = DatasetService::new(state.db.clone());
    let outcome = service
        .upload(bytes, &name, &principal, &state.summarizer)
        .await?;

    Ok(Json(json!({
        "message": "Upload successful",
        "file": outcome.dataset,
        "summary": outcome.narrative.text,
        "summarySource": outcome.narrative.source,
    })))
}

/// GET /api/files/recent — the caller's latest uploads.
pub async fn recent_datasets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<datasets::Model>>> {
    let principal = authenticate(&state, &headers).await?;
    let service = DatasetService::new(state.db.clone());
    let datasets = service.list_recent(&principal).await?;
    Ok(Json(datasets))
}

/// GET /api/files/all — unscoped listing, admin and above.
pub async fn all_datasets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<datasets::Model>>> {
    let principal = authenticate(&state, &headers).await?;
    let service = DatasetService::new(state.db.clone());
    let datasets = service.list_all(&principal).await?;
    Ok(Json(datasets))
}

/// GET /api/files/:id — owner or admin.
pub async fn get_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> AppResult<Json<datasets::Model>> {
    let principal = authenticate(&state, &headers).await?;
    let service = DatasetService::new(state.db.clone());
    let dataset = service.get_by_id(id, &principal).await?;
    Ok(Json(dataset))
}

/// DELETE /api/files/:id — admin and above, regardless of ownership.
pub async fn delete_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let principal = authenticate(&state, &headers).await?;
    let service = DatasetService::new(state.db.clone());
    service.delete(id, &principal).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}
