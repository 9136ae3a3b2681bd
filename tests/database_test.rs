//! Database and service-level tests
//!
//! Migrations, entity operations, and the dataset/analysis service
//! semantics that do not need the HTTP layer.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, Set,
};
use serde_json::json;
use tempfile::{NamedTempFile, TempDir};

use sheetpulse::auth::{Principal, Role};
use sheetpulse::database::connection::setup_database;
use sheetpulse::database::entities::{analyses, datasets};
use sheetpulse::errors::AppError;
use sheetpulse::narrative::{NarrativeClient, Summarizer};
use sheetpulse::services::analysis_service::SaveAnalysis;
use sheetpulse::services::{AnalysisService, DatasetService};

struct UnavailableNarrative;

#[async_trait]
impl NarrativeClient for UnavailableNarrative {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow::anyhow!("service unavailable"))
    }
}

fn summarizer() -> Summarizer {
    Summarizer::new(Arc::new(UnavailableNarrative), Duration::from_millis(200))
}

/// Create a test database connection with migrations applied.
async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

fn user() -> Principal {
    Principal::new("user-1", Role::User)
}

fn admin() -> Principal {
    Principal::new("admin-1", Role::Admin)
}

const SALES_CSV: &[u8] = b"Name,Sales,Month\nJohn,1200,Jan\nMary,1500,Feb\nAlex,1800,Mar\n";

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let datasets = datasets::Entity::find().all(&db).await?;
    assert_eq!(datasets.len(), 0);

    let analyses = analyses::Entity::find().all(&db).await?;
    assert_eq!(analyses.len(), 0);

    Ok(())
}

#[tokio::test]
async fn test_dataset_rows_round_trip_as_json() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let rows = json!([
        {"Name": "John", "Sales": 1200, "Month": "Jan"},
        {"Name": "Mary", "Sales": 1500, "Month": "Feb"}
    ]);

    let dataset = datasets::ActiveModel {
        original_name: Set("sales.xlsx".to_string()),
        rows: Set(rows.clone()),
        owner_id: Set("user-1".to_string()),
        narrative_text: Set(None),
        narrative_source: Set(None),
        narrative_generated_at: Set(None),
        blob_path: Set(None),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    };
    let dataset = dataset.insert(&db).await?;

    let fetched = datasets::Entity::find_by_id(dataset.id)
        .one(&db)
        .await?
        .unwrap();
    assert_eq!(fetched.rows, rows);
    assert_eq!(fetched.original_name, "sales.xlsx");

    Ok(())
}

#[tokio::test]
async fn test_upload_persists_dataset_with_fallback_narrative() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = DatasetService::new(db.clone());

    let outcome = service
        .upload(SALES_CSV.to_vec(), "sales.csv", &user(), &summarizer())
        .await?;

    assert_eq!(outcome.dataset.owner_id, "user-1");
    assert_eq!(outcome.dataset.narrative_source.as_deref(), Some("fallback"));
    assert_eq!(
        outcome.dataset.narrative_text.as_deref(),
        Some("Values range between 1200 and 1800, averaging 1500.00. Trend: upward.")
    );
    assert_eq!(outcome.dataset.rows.as_array().unwrap().len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_failed_parse_persists_nothing() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = DatasetService::new(db.clone());

    let result = service
        .upload(b"Name,Sales\n".to_vec(), "empty.csv", &user(), &summarizer())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let count = datasets::Entity::find().count(&db).await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_requires_admin_even_for_owner() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = DatasetService::new(db.clone());

    let outcome = service
        .upload(SALES_CSV.to_vec(), "sales.csv", &user(), &summarizer())
        .await?;

    let result = service.delete(outcome.dataset.id, &user()).await;
    assert!(matches!(result, Err(AppError::AccessDenied(_))));

    service.delete(outcome.dataset.id, &admin()).await?;
    let result = service.delete(outcome.dataset.id, &admin()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_delete_removes_legacy_blob_and_tolerates_absence() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = DatasetService::new(db.clone());

    let blob_dir = TempDir::new()?;
    let blob_path = blob_dir.path().join("legacy.xlsx");
    let mut blob = std::fs::File::create(&blob_path)?;
    blob.write_all(b"legacy bytes")?;

    let with_blob = datasets::ActiveModel {
        original_name: Set("legacy.xlsx".to_string()),
        rows: Set(json!([{"A": 1}])),
        owner_id: Set("user-1".to_string()),
        narrative_text: Set(None),
        narrative_source: Set(None),
        narrative_generated_at: Set(None),
        blob_path: Set(Some(blob_path.display().to_string())),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    };
    let with_blob = with_blob.insert(&db).await?;

    service.delete(with_blob.id, &admin()).await?;
    assert!(!blob_path.exists());

    // A record whose blob is already gone deletes cleanly too
    let missing_blob = datasets::ActiveModel {
        original_name: Set("gone.xlsx".to_string()),
        rows: Set(json!([{"A": 1}])),
        owner_id: Set("user-1".to_string()),
        narrative_text: Set(None),
        narrative_source: Set(None),
        narrative_generated_at: Set(None),
        blob_path: Set(Some(
            blob_dir.path().join("never-existed.xlsx").display().to_string(),
        )),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    };
    let missing_blob = missing_blob.insert(&db).await?;
    service.delete(missing_blob.id, &admin()).await?;

    let count = datasets::Entity::find().count(&db).await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn test_get_by_id_enforces_visibility() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = DatasetService::new(db.clone());

    let outcome = service
        .upload(SALES_CSV.to_vec(), "sales.csv", &user(), &summarizer())
        .await?;
    let id = outcome.dataset.id;

    assert!(service.get_by_id(id, &user()).await.is_ok());
    assert!(service.get_by_id(id, &admin()).await.is_ok());

    let stranger = Principal::new("user-2", Role::User);
    let result = service.get_by_id(id, &stranger).await;
    assert!(matches!(result, Err(AppError::AccessDenied(_))));

    let result = service.get_by_id(99999, &admin()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_analysis_save_validates_fields_and_reference() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let datasets_service = DatasetService::new(db.clone());
    let service = AnalysisService::new(db.clone());

    let outcome = datasets_service
        .upload(SALES_CSV.to_vec(), "sales.csv", &user(), &summarizer())
        .await?;

    // Blank field counts as missing
    let result = service
        .save(
            SaveAnalysis {
                dataset_id: Some(outcome.dataset.id),
                x_axis: Some("  ".to_string()),
                y_axis: Some("Sales".to_string()),
                chart_type: Some("bar".to_string()),
            },
            &user(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // Unknown dataset reference
    let result = service
        .save(
            SaveAnalysis {
                dataset_id: Some(99999),
                x_axis: Some("Month".to_string()),
                y_axis: Some("Sales".to_string()),
                chart_type: Some("bar".to_string()),
            },
            &user(),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(analyses::Entity::find().count(&db).await?, 0);

    let saved = service
        .save(
            SaveAnalysis {
                dataset_id: Some(outcome.dataset.id),
                x_axis: Some("Month".to_string()),
                y_axis: Some("Sales".to_string()),
                chart_type: Some("bar".to_string()),
            },
            &user(),
        )
        .await?;
    assert_eq!(saved.dataset_id, outcome.dataset.id);
    assert_eq!(saved.owner_id, "user-1");

    Ok(())
}

#[tokio::test]
async fn test_analysis_listing_is_owner_scoped_with_projection() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let datasets_service = DatasetService::new(db.clone());
    let service = AnalysisService::new(db.clone());

    let outcome = datasets_service
        .upload(SALES_CSV.to_vec(), "sales.csv", &user(), &summarizer())
        .await?;

    for chart_type in ["bar", "line"] {
        tokio::time::sleep(Duration::from_millis(5)).await;
        service
            .save(
                SaveAnalysis {
                    dataset_id: Some(outcome.dataset.id),
                    x_axis: Some("Month".to_string()),
                    y_axis: Some("Sales".to_string()),
                    chart_type: Some(chart_type.to_string()),
                },
                &user(),
            )
            .await?;
    }

    let listed = service.list_for_owner(&user()).await?;
    assert_eq!(listed.len(), 2);
    // Newest first
    assert_eq!(listed[0].analysis.chart_type, "line");
    let projection = listed[0].dataset.as_ref().unwrap();
    assert_eq!(projection.original_name, "sales.csv");

    let stranger = Principal::new("user-2", Role::User);
    assert!(service.list_for_owner(&stranger).await?.is_empty());

    Ok(())
}
