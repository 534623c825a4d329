//! Route definitions for the `/transactions` resource.
//!
//! All endpoints require authentication; every mutation is scoped to the
//! calling user.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::transactions;
use crate::state::AppState;

/// Routes mounted at `/transactions`.
///
/// ```text
/// POST   /borrow                  -> borrow
/// GET    /active                  -> list_active
/// GET    /history                 -> history
/// POST   /{id}/confirm-pickup     -> confirm_pickup
/// POST   /{id}/confirm-return     -> confirm_return
/// POST   /{id}/cancel             -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/borrow", post(transactions::borrow))
        .route("/active", get(transactions::list_active))
        .route("/history", get(transactions::history))
        .route("/{id}/confirm-pickup", post(transactions::confirm_pickup))
        .route("/{id}/confirm-return", post(transactions::confirm_return))
        .route("/{id}/cancel", post(transactions::cancel))
}
