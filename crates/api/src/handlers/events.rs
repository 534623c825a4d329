//! Handlers for the `/events` resource — the audit trail (admin only).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bibliobox_db::repositories::EventRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the event listing.
#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    /// Exact event type to filter on, e.g. `transaction.created`.
    pub event_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/events
///
/// Newest-first page of persisted platform events (admin only).
pub async fn list_events(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> AppResult<impl IntoResponse> {
    auth.require_admin()?;

    let events = EventRepo::list(
        &state.pool,
        params.event_type.as_deref(),
        params.limit,
        params.offset,
    )
    .await?;

    Ok(Json(DataResponse { data: events }))
}
