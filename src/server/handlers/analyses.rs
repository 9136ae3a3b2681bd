use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use sea_orm::EntityTrait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::authenticate;
use crate::database::entities::analyses;
use crate::database::entities::datasets::Entity as Datasets;
use crate::errors::{AppError, AppResult};
use crate::ingest::Row;
use crate::server::app::AppState;
use crate::services::analysis_service::{AnalysisWithDataset, SaveAnalysis};
use crate::services::AnalysisService;
use crate::stats;

/// POST /api/analysis/save
pub async fn save_analysis(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SaveAnalysis>,
) -> AppResult<(StatusCode, Json<analyses::Model>)> {
    let principal = authenticate(&state, &headers).await?;
    let service = AnalysisService::new(state.db.clone());
    let analysis = service.save(request, &principal).await?;
    Ok((StatusCode::CREATED, Json(analysis)))
}

/// GET /api/analysis — the caller's saved analyses, newest first.
pub async fn list_analyses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<AnalysisWithDataset>>> {
    let principal = authenticate(&state, &headers).await?;
    let service = AnalysisService::new(state.db.clone());
    let analyses = service.list_for_owner(&principal).await?;
    Ok(Json(analyses))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub file_id: Option<i32>,
    pub chart_data: Option<Vec<Value>>,
}

/// POST /api/ai/summary — narrative for a stored dataset or an ad-hoc
/// numeric series. Always yields text; upstream failures fall back.
pub async fn ai_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SummaryRequest>,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers).await?;

    let narrative = if let Some(file_id) = request.file_id {
        let dataset = Datasets::find_by_id(file_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("dataset not found".to_string()))?;

        let rows: Vec<Row> =
            serde_json::from_value(dataset.rows).context("decoding stored rows")?;
        let column_stats = stats::aggregate(&rows);
        state.summarizer.summarize(&column_stats, &rows).await
    } else if let Some(chart_data) = request.chart_data {
        let series: Vec<f64> = chart_data.iter().filter_map(stats::numeric_value).collect();
        state.summarizer.summarize_series(&series).await
    } else {
        return Err(AppError::Validation("no data provided".to_string()));
    };

    Ok(Json(json!({
        "summary": narrative.text,
        "source": narrative.source,
    })))
}
