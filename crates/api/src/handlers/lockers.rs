//! Handlers for the `/lockers` resource — the availability resolver surface.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Duration;
use serde::Deserialize;

use bibliobox_core::interval::TimeWindow;
use bibliobox_core::types::Timestamp;
use bibliobox_db::repositories::LockerRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the availability endpoint.
#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    /// Start of the query window (RFC 3339).
    pub time: Timestamp,
    /// Window length in seconds; defaults to the configured locker window.
    pub window_secs: Option<i64>,
}

/// GET /api/v1/lockers
///
/// The whole fleet in stable id order.
pub async fn list_lockers(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let lockers = LockerRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: lockers }))
}

/// GET /api/v1/lockers/available?time=...&window_secs=...
///
/// Lockers free for the whole window `[time, time + window_secs)`.
/// An empty list means no booking is possible for that window.
pub async fn available_lockers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AvailableQuery>,
) -> AppResult<impl IntoResponse> {
    let window_secs = params
        .window_secs
        .unwrap_or(state.config.lending.locker_window_secs);
    let window = TimeWindow::starting_at(params.time, Duration::seconds(window_secs))
        .map_err(AppError::Core)?;

    let lockers = LockerRepo::find_available(&state.pool, &window).await?;
    Ok(Json(DataResponse { data: lockers }))
}
