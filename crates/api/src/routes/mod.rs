pub mod books;
pub mod events;
pub mod health;
pub mod lockers;
pub mod schedules;
pub mod transactions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /books                                 list (GET), create (POST, admin)
/// /books/{id}                            get
/// /books/{id}/availability               availability check
/// /books/{id}/adjust                     stock adjustment (POST, admin)
///
/// /lockers                               fleet listing
/// /lockers/available                     free lockers for a window
///
/// /locker-schedules/active               caller's currently-open lockers
///
/// /transactions/borrow                   create borrow (POST)
/// /transactions/active                   caller's active transactions
/// /transactions/history                  paginated lending history
/// /transactions/{id}/confirm-pickup      pickup confirmation (POST)
/// /transactions/{id}/confirm-return      return confirmation (POST)
/// /transactions/{id}/cancel              cancellation (POST)
///
/// /events                                audit trail (GET, admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/books", books::router())
        .nest("/lockers", lockers::router())
        .nest("/locker-schedules", schedules::router())
        .nest("/transactions", transactions::router())
        .nest("/events", events::router())
}
