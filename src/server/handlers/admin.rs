use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{json, Value};

use super::authenticate;
use crate::auth::{self, Role};
use crate::database::entities::analyses::Entity as Analyses;
use crate::database::entities::datasets::Entity as Datasets;
use crate::errors::AppResult;
use crate::server::app::AppState;

/// GET /api/admin/stats — record counts for the two collections this
/// service owns. Superadmin only.
pub async fn store_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let principal = authenticate(&state, &headers).await?;
    auth::require_role(&principal, Role::Superadmin)?;

    let datasets = Datasets::find().count(&state.db).await?;
    let analyses = Analyses::find().count(&state.db).await?;

    Ok(Json(json!({
        "datasets": datasets,
        "analyses": analyses,
    })))
}
