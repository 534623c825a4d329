//! Route definitions for the `/books` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::books;
use crate::state::AppState;

/// Routes mounted at `/books`.
///
/// ```text
/// GET    /                     -> list_books
/// POST   /                     -> create_book (admin)
/// GET    /{id}                 -> get_book
/// GET    /{id}/availability    -> check_availability
/// POST   /{id}/adjust          -> adjust_quantity (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(books::list_books).post(books::create_book))
        .route("/{id}", get(books::get_book))
        .route("/{id}/availability", get(books::check_availability))
        .route("/{id}/adjust", post(books::adjust_quantity))
}
