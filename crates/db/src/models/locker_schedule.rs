//! Locker schedule (reservation) model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use bibliobox_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `locker_schedules` table: an exclusive claim on one
/// locker for the half-open interval `[start_time, end_time)`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LockerSchedule {
    pub id: DbId,
    pub locker_id: DbId,
    pub user_id: DbId,
    pub transaction_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for reserving a locker. Built internally by the lending flows,
/// never deserialized from a request body.
#[derive(Debug, Clone)]
pub struct ReserveLocker {
    pub locker_id: DbId,
    pub user_id: DbId,
    pub transaction_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}
