pub mod admin;
pub mod analyses;
pub mod datasets;
pub mod health;

use axum::http::{header, HeaderMap};

use crate::auth::Principal;
use crate::errors::{AppError, AppResult};
use crate::server::app::AppState;

/// Resolve the bearer credential on the request to a principal through the
/// access gate. Missing or unknown credentials are both 401.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<Principal> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    state.gate.resolve(token).await.ok_or(AppError::Unauthorized)
}
