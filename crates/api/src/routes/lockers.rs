//! Route definitions for the `/lockers` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::lockers;
use crate::state::AppState;

/// Routes mounted at `/lockers`.
///
/// ```text
/// GET    /            -> list_lockers
/// GET    /available   -> available_lockers
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(lockers::list_lockers))
        .route("/available", get(lockers::available_lockers))
}
