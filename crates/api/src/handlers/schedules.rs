//! Handlers for the `/locker-schedules` resource.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use bibliobox_db::repositories::LockerScheduleRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/locker-schedules/active
///
/// The caller's live schedules whose window contains the current instant —
/// i.e. the lockers they can open right now.
pub async fn list_active_schedules(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let schedules =
        LockerScheduleRepo::list_active_for_user(&state.pool, auth.user_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: schedules }))
}
