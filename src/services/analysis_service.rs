//! Saved chart configurations and their owner-scoped listing.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::database::entities::analyses::{self, Entity as Analyses};
use crate::database::entities::datasets::{self, Entity as Datasets};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnalysis {
    pub dataset_id: Option<i32>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub chart_type: Option<String>,
}

/// Minimal dataset projection attached to each listed analysis for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub original_name: String,
    pub uploaded_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisWithDataset {
    #[serde(flatten)]
    pub analysis: analyses::Model,
    /// `None` when the referenced dataset has since been deleted.
    pub dataset: Option<DatasetRef>,
}

pub struct AnalysisService {
    db: DatabaseConnection,
}

impl AnalysisService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All four fields are required; the referenced dataset must exist at
    /// save time. Ownership of the dataset is not checked.
    pub async fn save(
        &self,
        request: SaveAnalysis,
        principal: &Principal,
    ) -> AppResult<analyses::Model> {
        let dataset_id = request
            .dataset_id
            .ok_or_else(|| missing_field("datasetId"))?;
        let x_axis = required(request.x_axis, "xAxis")?;
        let y_axis = required(request.y_axis, "yAxis")?;
        let chart_type = required(request.chart_type, "chartType")?;

        Datasets::find_by_id(dataset_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("dataset not found".to_string()))?;

        let model = analyses::ActiveModel {
            owner_id: Set(principal.id.clone()),
            dataset_id: Set(dataset_id),
            x_axis: Set(x_axis),
            y_axis: Set(y_axis),
            chart_type: Set(chart_type),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let analysis = model.insert(&self.db).await?;
        Ok(analysis)
    }

    /// The caller's analyses, newest first, each with its dataset
    /// projection. A dangling reference yields no projection, not an error.
    pub async fn list_for_owner(
        &self,
        principal: &Principal,
    ) -> AppResult<Vec<AnalysisWithDataset>> {
        let entries = Analyses::find()
            .filter(analyses::Column::OwnerId.eq(&principal.id))
            .order_by_desc(analyses::Column::CreatedAt)
            .find_also_related(Datasets)
            .all(&self.db)
            .await?;

        let enriched = entries
            .into_iter()
            .map(|(analysis, dataset)| AnalysisWithDataset {
                analysis,
                dataset: dataset.map(|d| DatasetRef {
                    original_name: d.original_name,
                    uploaded_at: d.uploaded_at,
                }),
            })
            .collect();
        Ok(enriched)
    }
}

fn missing_field(name: &str) -> AppError {
    AppError::Validation(format!("missing required field: {name}"))
}

fn required(value: Option<String>, name: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(missing_field(name)),
    }
}
