//! Handlers for the `/transactions` resource — the lending lifecycle.
//!
//! Handlers stay thin: validate the request, call the one atomic
//! `TransactionRepo` transition, map the outcome to a typed error, and
//! publish the platform events once the transition has committed. Device
//! signalling rides on the event bus and can never fail the request.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use bibliobox_core::error::CoreError;
use bibliobox_core::lending::state_machine::status_name;
use bibliobox_core::types::DbId;
use bibliobox_db::models::locker::Locker;
use bibliobox_db::models::locker_schedule::LockerSchedule;
use bibliobox_db::models::transaction::{
    BorrowOutcome, BorrowRequest, CancelOutcome, CancelRequest, PickupOutcome, ReturnOutcome,
    Transaction,
};
use bibliobox_db::repositories::TransactionRepo;
use bibliobox_events::bus::topics;
use bibliobox_events::{LockerCommand, PlatformEvent};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Response body for a created borrow.
#[derive(Debug, Serialize)]
pub struct BorrowResponse {
    pub transaction: Transaction,
    pub locker: Locker,
}

/// Response body for a confirmed return.
#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub transaction: Transaction,
    /// Locker reserved for the physical drop-off.
    pub drop_locker_id: DbId,
    pub late: bool,
}

// ---------------------------------------------------------------------------
// Create borrow
// ---------------------------------------------------------------------------

/// POST /api/v1/transactions/borrow
///
/// Create a borrow: take a copy, reserve the first free locker for the
/// pickup window, open the transaction. Returns 201 with the transaction
/// and the assigned locker.
pub async fn borrow(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<BorrowRequest>,
) -> AppResult<impl IntoResponse> {
    if input.pickup_time >= input.return_time {
        return Err(AppError::Core(CoreError::Validation(
            "pickup_time must be before return_time".into(),
        )));
    }

    let policy = state.config.lending.grace_policy();
    let outcome = TransactionRepo::create_borrow(&state.pool, auth.user_id, &input, &policy).await?;

    match outcome {
        BorrowOutcome::Created {
            transaction,
            locker,
            schedule,
        } => {
            tracing::info!(
                transaction_id = transaction.id,
                book_id = transaction.book_id,
                locker_id = locker.id,
                user_id = auth.user_id,
                "Borrow transaction created"
            );

            state.event_bus.publish(
                PlatformEvent::new(topics::TRANSACTION_CREATED)
                    .with_source("transaction", transaction.id)
                    .with_actor(auth.user_id)
                    .with_payload(serde_json::json!({
                        "book_id": transaction.book_id,
                        "locker_id": locker.id,
                    })),
            );
            publish_assignment(&state, auth.user_id, &schedule);

            Ok((
                StatusCode::CREATED,
                Json(DataResponse {
                    data: BorrowResponse {
                        transaction,
                        locker,
                    },
                }),
            ))
        }
        BorrowOutcome::BookNotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Book",
            id: input.book_id,
        })),
        BorrowOutcome::BookUnavailable => Err(AppError::Core(CoreError::Capacity(
            "Book is not available for borrowing".into(),
        ))),
        BorrowOutcome::NoLockerAvailable => Err(AppError::Core(CoreError::Capacity(
            "No lockers available for the requested pickup time".into(),
        ))),
    }
}

// ---------------------------------------------------------------------------
// Confirm pickup
// ---------------------------------------------------------------------------

/// POST /api/v1/transactions/{id}/confirm-pickup
///
/// Record that the borrower has taken the book. Accepted only inside the
/// pickup window `[scheduled, scheduled + grace]`.
pub async fn confirm_pickup(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let policy = state.config.lending.grace_policy();
    let outcome = TransactionRepo::confirm_pickup(
        &state.pool,
        auth.user_id,
        transaction_id,
        Utc::now(),
        &policy,
    )
    .await?;

    match outcome {
        PickupOutcome::Confirmed(transaction) => {
            tracing::info!(
                transaction_id,
                user_id = auth.user_id,
                "Pickup confirmed"
            );

            state.event_bus.publish(
                PlatformEvent::new(topics::TRANSACTION_PICKED_UP)
                    .with_source("transaction", transaction.id)
                    .with_actor(auth.user_id)
                    .with_payload(serde_json::json!({ "book_id": transaction.book_id })),
            );

            Ok(Json(DataResponse { data: transaction }))
        }
        PickupOutcome::NotFound => Err(not_found(transaction_id)),
        PickupOutcome::InvalidState(status_id) => {
            Err(AppError::Core(CoreError::InvalidTransition {
                action: "confirm pickup for",
                state: status_name(status_id),
            }))
        }
        PickupOutcome::TooEarly => Err(AppError::Core(CoreError::Validation(
            "The pickup window has not opened yet".into(),
        ))),
        PickupOutcome::GraceExpired => Err(AppError::Core(CoreError::Conflict(
            "The pickup window has closed".into(),
        ))),
    }
}

// ---------------------------------------------------------------------------
// Confirm return
// ---------------------------------------------------------------------------

/// POST /api/v1/transactions/{id}/confirm-return
///
/// Record that the book came back: inventory is released and a drop-off
/// locker is reserved for the current window. Past the return grace the
/// transaction lands `late` instead of `finished`.
pub async fn confirm_return(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let policy = state.config.lending.grace_policy();
    let outcome = TransactionRepo::confirm_return(
        &state.pool,
        auth.user_id,
        transaction_id,
        Utc::now(),
        &policy,
    )
    .await?;

    match outcome {
        ReturnOutcome::Returned {
            transaction,
            drop_schedule,
            late,
        } => {
            tracing::info!(
                transaction_id,
                user_id = auth.user_id,
                drop_locker_id = drop_schedule.locker_id,
                late,
                "Return confirmed"
            );

            state.event_bus.publish(
                PlatformEvent::new(topics::TRANSACTION_RETURNED)
                    .with_source("transaction", transaction.id)
                    .with_actor(auth.user_id)
                    .with_payload(serde_json::json!({
                        "book_id": transaction.book_id,
                        "late": late,
                    })),
            );
            publish_assignment(&state, auth.user_id, &drop_schedule);

            Ok(Json(DataResponse {
                data: ReturnResponse {
                    drop_locker_id: drop_schedule.locker_id,
                    transaction,
                    late,
                },
            }))
        }
        ReturnOutcome::NotFound => Err(not_found(transaction_id)),
        ReturnOutcome::InvalidState(status_id) => {
            Err(AppError::Core(CoreError::InvalidTransition {
                action: "confirm return for",
                state: status_name(status_id),
            }))
        }
        ReturnOutcome::NoLockerAvailable => Err(AppError::Core(CoreError::Capacity(
            "No lockers available for the drop-off window".into(),
        ))),
        ReturnOutcome::InventoryInconsistent => Err(AppError::Core(CoreError::Internal(format!(
            "Inventory for transaction {transaction_id} is inconsistent"
        )))),
    }
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/transactions/{id}/cancel
///
/// Cancel before pickup: the locker claim is soft-cancelled, the copy goes
/// back on the shelf, device access is revoked.
pub async fn cancel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<DbId>,
    Json(input): Json<CancelRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome =
        TransactionRepo::cancel(&state.pool, auth.user_id, transaction_id, input.book_id).await?;

    match outcome {
        CancelOutcome::Cancelled(transaction) => {
            tracing::info!(
                transaction_id,
                book_id = transaction.book_id,
                user_id = auth.user_id,
                "Transaction cancelled"
            );

            state.event_bus.publish(
                PlatformEvent::new(topics::TRANSACTION_CANCELLED)
                    .with_source("transaction", transaction.id)
                    .with_actor(auth.user_id)
                    .with_payload(serde_json::json!({ "book_id": transaction.book_id })),
            );
            state.event_bus.publish(
                PlatformEvent::new(topics::LOCKER_REVOKED)
                    .with_source("locker", transaction.locker_id)
                    .with_actor(auth.user_id)
                    .with_payload(
                        serde_json::to_value(LockerCommand::revoke(
                            transaction.locker_id,
                            auth.user_id,
                            transaction.id,
                        ))
                        .unwrap_or_default(),
                    ),
            );

            Ok(Json(DataResponse { data: transaction }))
        }
        CancelOutcome::NotFound => Err(not_found(transaction_id)),
        CancelOutcome::BookMismatch => Err(AppError::Core(CoreError::Validation(
            "book_id does not match the transaction".into(),
        ))),
        CancelOutcome::AlreadyPickedUp => Err(AppError::Core(CoreError::Conflict(
            "Cannot cancel: the book has already been picked up".into(),
        ))),
        CancelOutcome::InvalidState(status_id) => {
            Err(AppError::Core(CoreError::InvalidTransition {
                action: "cancel",
                state: status_name(status_id),
            }))
        }
        CancelOutcome::InventoryInconsistent => Err(AppError::Core(CoreError::Internal(format!(
            "Inventory for transaction {transaction_id} is inconsistent"
        )))),
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/v1/transactions/active
///
/// The caller's scheduled, waiting, and late transactions, newest pickup
/// first.
pub async fn list_active(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let transactions = TransactionRepo::list_active_by_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: transactions }))
}

/// GET /api/v1/transactions/history
///
/// One page of the caller's full lending history.
pub async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let page =
        TransactionRepo::history_by_user(&state.pool, auth.user_id, params.limit, params.offset)
            .await?;
    Ok(Json(DataResponse { data: page }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Publish the `locker.assigned` event carrying the device command for a
/// freshly reserved schedule.
fn publish_assignment(state: &AppState, user_id: DbId, schedule: &LockerSchedule) {
    let command = LockerCommand::assign(
        schedule.locker_id,
        user_id,
        schedule.transaction_id,
        schedule.start_time,
        schedule.end_time,
    );
    state.event_bus.publish(
        PlatformEvent::new(topics::LOCKER_ASSIGNED)
            .with_source("locker", schedule.locker_id)
            .with_actor(user_id)
            .with_payload(serde_json::to_value(&command).unwrap_or_default()),
    );
}

fn not_found(transaction_id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Transaction",
        id: transaction_id,
    })
}
