//! Dataset lifecycle: upload pipeline and ownership-scoped retrieval.

use anyhow::Context;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tokio::task;
use tracing::{info, warn};

use crate::auth::{self, Principal, Role};
use crate::database::entities::datasets::{self, Entity as Datasets};
use crate::errors::{AppError, AppResult};
use crate::ingest;
use crate::narrative::{Narrative, Summarizer};
use crate::stats;

const RECENT_LIMIT: u64 = 5;

pub struct UploadOutcome {
    pub dataset: datasets::Model,
    pub narrative: Narrative,
}

pub struct DatasetService {
    db: DatabaseConnection,
}

impl DatasetService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Parse, aggregate, summarize and persist in one pass. A parse failure
    /// aborts before anything is written.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        original_name: &str,
        principal: &Principal,
        summarizer: &Summarizer,
    ) -> AppResult<UploadOutcome> {
        let name = original_name.to_string();
        let rows = task::spawn_blocking(move || ingest::parse(&bytes, &name))
            .await
            .context("ingestion task panicked")??;

        let column_stats = stats::aggregate(&rows);
        let narrative = summarizer.summarize(&column_stats, &rows).await;

        let row_count = rows.len();
        let model = datasets::ActiveModel {
            original_name: Set(original_name.to_string()),
            rows: Set(serde_json::to_value(&rows).context("serializing rows")?),
            owner_id: Set(principal.id.clone()),
            narrative_text: Set(Some(narrative.text.clone())),
            narrative_source: Set(Some(narrative.source.as_str().to_string())),
            narrative_generated_at: Set(Some(narrative.generated_at)),
            blob_path: Set(None),
            uploaded_at: Set(Utc::now()),
            ..Default::default()
        };

        let dataset = model.insert(&self.db).await?;
        info!(
            dataset_id = dataset.id,
            owner = %principal.id,
            rows = row_count,
            source = narrative.source.as_str(),
            "dataset uploaded"
        );

        Ok(UploadOutcome { dataset, narrative })
    }

    /// Owners see their own datasets; admins and superadmins see any.
    pub async fn get_by_id(&self, id: i32, principal: &Principal) -> AppResult<datasets::Model> {
        let dataset = Datasets::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("dataset not found".to_string()))?;

        if !auth::can_view(principal, &dataset.owner_id) {
            return Err(AppError::AccessDenied("access denied".to_string()));
        }
        Ok(dataset)
    }

    /// The caller's most recent uploads, newest first.
    pub async fn list_recent(&self, principal: &Principal) -> AppResult<Vec<datasets::Model>> {
        let datasets = Datasets::find()
            .filter(datasets::Column::OwnerId.eq(&principal.id))
            .order_by_desc(datasets::Column::UploadedAt)
            .limit(RECENT_LIMIT)
            .all(&self.db)
            .await?;
        Ok(datasets)
    }

    /// Unscoped listing, admin and above.
    pub async fn list_all(&self, principal: &Principal) -> AppResult<Vec<datasets::Model>> {
        auth::require_role(principal, Role::Admin)?;
        let datasets = Datasets::find()
            .order_by_desc(datasets::Column::UploadedAt)
            .all(&self.db)
            .await?;
        Ok(datasets)
    }

    /// Deletion is a privileged operation even for one's own dataset. The
    /// store record removal is the operation of record; the legacy disk
    /// blob is removed best-effort afterwards.
    pub async fn delete(&self, id: i32, principal: &Principal) -> AppResult<()> {
        auth::require_role(principal, Role::Admin)?;

        let dataset = Datasets::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("dataset not found".to_string()))?;

        let blob_path = dataset.blob_path.clone();
        Datasets::delete_by_id(id).exec(&self.db).await?;
        info!(dataset_id = id, "dataset deleted");

        if let Some(path) = blob_path {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(
                        dataset_id = id,
                        path = %path,
                        error = %err,
                        "dataset blob removal failed; record is already gone"
                    );
                }
            }
        }

        Ok(())
    }
}
