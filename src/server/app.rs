use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{admin, analyses, datasets, health};
use crate::auth::AccessGate;
use crate::narrative::Summarizer;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub summarizer: Arc<Summarizer>,
    pub gate: Arc<dyn AccessGate>,
}

pub async fn create_app(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Dataset routes
        .route("/files/upload", post(datasets::upload_dataset))
        .route("/files/recent", get(datasets::recent_datasets))
        .route("/files/all", get(datasets::all_datasets))
        .route("/files/:id", get(datasets::get_dataset))
        .route("/files/:id", delete(datasets::delete_dataset))
        // Analysis routes
        .route("/analysis/save", post(analyses::save_analysis))
        .route("/analysis", get(analyses::list_analyses))
        .route("/ai/summary", post(analyses::ai_summary))
        // Admin routes
        .route("/admin/stats", get(admin::store_stats))
}
