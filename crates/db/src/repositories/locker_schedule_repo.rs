//! Repository for the `locker_schedules` table — the reservation ledger.
//!
//! Reservations are conditional inserts: the row lands only if no live
//! schedule overlaps it. Because two concurrent `NOT EXISTS` probes can
//! both pass under READ COMMITTED, writers first take a per-locker advisory
//! transaction lock ([`LockerScheduleRepo::try_lock_locker`]); the lock is
//! released automatically at commit/rollback.

use sqlx::{PgConnection, PgExecutor, PgPool};

use bibliobox_core::types::{DbId, Timestamp};

use crate::models::locker_schedule::{LockerSchedule, ReserveLocker};
use crate::models::status::ScheduleStatus;

const COLUMNS: &str = "\
    id, locker_id, user_id, transaction_id, start_time, end_time, \
    status_id, created_at, updated_at";

/// Reservation operations on locker schedules.
pub struct LockerScheduleRepo;

impl LockerScheduleRepo {
    /// Try to serialize schedule writes for one locker within the current
    /// database transaction (`pg_try_advisory_xact_lock`; released at
    /// commit/rollback).
    ///
    /// Returns `false` when another transaction holds the lock — callers in
    /// a first-fit loop skip to the next candidate instead of blocking, so
    /// two flows claiming lockers in different orders cannot deadlock.
    pub async fn try_lock_locker(
        conn: &mut PgConnection,
        locker_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_xact_lock($1)")
            .bind(locker_id)
            .fetch_one(conn)
            .await
    }

    /// Insert a reservation iff no live schedule overlaps it.
    ///
    /// Returns `None` when an overlapping non-cancelled schedule already
    /// exists for the locker — a conflict detected at write time. Callers
    /// must hold the locker's advisory lock for the check-then-insert to be
    /// race-free.
    pub async fn reserve(
        executor: impl PgExecutor<'_>,
        input: &ReserveLocker,
    ) -> Result<Option<LockerSchedule>, sqlx::Error> {
        let query = format!(
            "INSERT INTO locker_schedules \
                 (locker_id, user_id, transaction_id, start_time, end_time, status_id) \
             SELECT $1, $2, $3, $4, $5, $6 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM locker_schedules \
                 WHERE locker_id = $1 \
                   AND status_id = $6 \
                   AND start_time < $5 \
                   AND end_time > $4 \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LockerSchedule>(&query)
            .bind(input.locker_id)
            .bind(input.user_id)
            .bind(input.transaction_id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(ScheduleStatus::Scheduled.id())
            .fetch_optional(executor)
            .await
    }

    /// Whether any live schedule for `locker_id` overlaps `[start, end)`.
    pub async fn is_busy(
        executor: impl PgExecutor<'_>,
        locker_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM locker_schedules \
                 WHERE locker_id = $1 \
                   AND status_id = $4 \
                   AND start_time < $3 \
                   AND end_time > $2 \
             )",
        )
        .bind(locker_id)
        .bind(start)
        .bind(end)
        .bind(ScheduleStatus::Scheduled.id())
        .fetch_one(executor)
        .await
    }

    /// Soft-cancel every live schedule owned by a transaction.
    ///
    /// Rows are never deleted; the status flip preserves the audit trail.
    /// Returns the number of schedules cancelled.
    pub async fn cancel_by_transaction(
        executor: impl PgExecutor<'_>,
        transaction_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE locker_schedules \
             SET status_id = $2, updated_at = NOW() \
             WHERE transaction_id = $1 AND status_id = $3",
        )
        .bind(transaction_id)
        .bind(ScheduleStatus::Cancelled.id())
        .bind(ScheduleStatus::Scheduled.id())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// A user's live schedules whose `[start, end)` contains `now`.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<LockerSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locker_schedules \
             WHERE user_id = $1 \
               AND status_id = $3 \
               AND start_time <= $2 \
               AND end_time > $2 \
             ORDER BY start_time"
        );
        sqlx::query_as::<_, LockerSchedule>(&query)
            .bind(user_id)
            .bind(now)
            .bind(ScheduleStatus::Scheduled.id())
            .fetch_all(pool)
            .await
    }

    /// All schedules for a transaction, oldest first (pickup, then drop-off).
    pub async fn list_by_transaction(
        pool: &PgPool,
        transaction_id: DbId,
    ) -> Result<Vec<LockerSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locker_schedules \
             WHERE transaction_id = $1 \
             ORDER BY start_time"
        );
        sqlx::query_as::<_, LockerSchedule>(&query)
            .bind(transaction_id)
            .fetch_all(pool)
            .await
    }
}
