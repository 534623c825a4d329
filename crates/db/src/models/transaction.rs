//! Borrow-transaction entity model, request DTOs, and transition outcomes.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bibliobox_core::types::{DbId, Timestamp};

use super::locker::Locker;
use super::locker_schedule::LockerSchedule;
use super::status::StatusId;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `transactions` table: one borrow-return lifecycle for one
/// user and one book. Rows are never deleted; they are the lending history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: DbId,
    pub user_id: DbId,
    pub book_id: DbId,
    pub locker_id: DbId,
    pub transaction_type: String,
    pub status_id: StatusId,
    pub scheduled_pickup_time: Timestamp,
    pub actual_pickup_time: Option<Timestamp>,
    pub scheduled_return_time: Timestamp,
    pub actual_return_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a borrow transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct BorrowRequest {
    pub book_id: DbId,
    pub pickup_time: Timestamp,
    pub return_time: Timestamp,
}

/// DTO for cancelling a transaction. The caller must echo the book id so a
/// stale client cancelling the wrong reservation is caught early.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    pub book_id: DbId,
}

// ---------------------------------------------------------------------------
// Transition outcomes (computed, not DB rows)
// ---------------------------------------------------------------------------

/// Result of attempting to create a borrow transaction.
#[derive(Debug)]
pub enum BorrowOutcome {
    /// Borrow created atomically; the pickup locker is reserved.
    Created {
        transaction: Transaction,
        locker: Locker,
        schedule: LockerSchedule,
    },
    /// The requested book does not exist.
    BookNotFound,
    /// The book exists but has no available copies.
    BookUnavailable,
    /// No locker is free for the pickup window.
    NoLockerAvailable,
}

/// Result of attempting to confirm a pickup.
#[derive(Debug)]
pub enum PickupOutcome {
    Confirmed(Transaction),
    /// No transaction with this id belongs to the caller.
    NotFound,
    /// The transaction is not awaiting pickup.
    InvalidState(StatusId),
    /// The pickup window has not opened yet.
    TooEarly,
    /// The pickup grace window has closed.
    GraceExpired,
}

/// Result of attempting to confirm a return.
#[derive(Debug)]
pub enum ReturnOutcome {
    Returned {
        transaction: Transaction,
        /// Locker reserved for the physical drop-off (usually the pickup
        /// locker, but any free one if that is busy).
        drop_schedule: LockerSchedule,
        late: bool,
    },
    NotFound,
    InvalidState(StatusId),
    /// No locker free for the drop-off window; the return is not recorded.
    NoLockerAvailable,
    /// Incrementing availability would exceed `total_quantity` — the
    /// inventory is inconsistent and the transition was rolled back.
    InventoryInconsistent,
}

/// Result of attempting to cancel a transaction.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Transaction),
    NotFound,
    /// The supplied book id does not match the transaction.
    BookMismatch,
    /// The book has already been picked up; cancellation is closed.
    AlreadyPickedUp,
    InvalidState(StatusId),
    /// See [`ReturnOutcome::InventoryInconsistent`].
    InventoryInconsistent,
}

// ---------------------------------------------------------------------------
// History listing
// ---------------------------------------------------------------------------

/// One page of a user's transaction history.
#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
