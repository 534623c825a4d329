//! Route definitions for the `/locker-schedules` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::schedules;
use crate::state::AppState;

/// Routes mounted at `/locker-schedules`.
///
/// ```text
/// GET    /active   -> list_active_schedules
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/active", get(schedules::list_active_schedules))
}
