pub mod app;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::auth::{AccessGate, TokenGate};
use crate::config::ServerConfig;
use crate::database::connection::{establish_connection, get_database_url, setup_database};
use crate::narrative::{NarrativeClient, OpenAiClient, Summarizer};

pub async fn start_server(config: ServerConfig) -> Result<()> {
    let database_url = get_database_url(Some(&config.database_path));
    let db = establish_connection(&database_url).await?;

    setup_database(&db).await?;
    info!("Database migrations completed");

    let client: Arc<dyn NarrativeClient> = Arc::new(OpenAiClient::new(&config.narrative));
    let summarizer = Arc::new(Summarizer::new(
        client,
        Duration::from_secs(config.narrative.timeout_secs),
    ));
    let gate: Arc<dyn AccessGate> = Arc::new(TokenGate::from_config(&config.tokens));

    let state = app::AppState { db, summarizer, gate };
    let app = app::create_app(state, config.cors_origin.as_deref()).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server running on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  GET    /health              - Health check");
    info!("  POST   /api/files/upload    - Upload a spreadsheet (multipart)");
    info!("  GET    /api/files/recent    - Caller's recent datasets");
    info!("  GET    /api/files/all       - All datasets (admin)");
    info!("  GET    /api/files/:id       - One dataset (owner or admin)");
    info!("  DELETE /api/files/:id       - Delete a dataset (admin)");
    info!("  POST   /api/analysis/save   - Save a chart configuration");
    info!("  GET    /api/analysis        - Caller's saved analyses");
    info!("  POST   /api/ai/summary      - Summarize a dataset or series");
    info!("  GET    /api/admin/stats     - Store counts (superadmin)");
}
