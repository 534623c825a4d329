//! Repository for the `transactions` table — the borrow lifecycle state
//! machine.
//!
//! Every transition runs as ONE database transaction: the row is fetched
//! `FOR UPDATE`, guards are checked against the locked snapshot, and all
//! side effects (inventory adjustment, schedule insert/cancel, status
//! update) commit or roll back together. Partial application is impossible.
//!
//! Guard failures are reported through the outcome enums in
//! `models::transaction`, not as errors; `sqlx::Error` is reserved for the
//! store itself misbehaving.

use sqlx::{PgPool, Postgres, Transaction as PgTx};

use bibliobox_core::interval::TimeWindow;
use bibliobox_core::lending::{
    check_pickup_timing, classify_return, GracePolicy, PickupTiming, ReturnClass,
};
use bibliobox_core::types::{DbId, Timestamp};

use crate::models::locker::Locker;
use crate::models::locker_schedule::{LockerSchedule, ReserveLocker};
use crate::models::status::TransactionStatus;
use crate::models::transaction::{
    BorrowOutcome, BorrowRequest, CancelOutcome, PickupOutcome, ReturnOutcome, Transaction,
    TransactionPage,
};
use crate::repositories::{BookRepo, LockerRepo, LockerScheduleRepo};

/// Column list for `transactions` queries.
const COLUMNS: &str = "\
    id, user_id, book_id, locker_id, transaction_type, status_id, \
    scheduled_pickup_time, actual_pickup_time, \
    scheduled_return_time, actual_return_time, \
    created_at, updated_at";

/// Maximum page size for history listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for history listing.
const DEFAULT_LIMIT: i64 = 10;

/// Statuses that count as "active" from the borrower's perspective.
const ACTIVE_STATUSES: [i16; 3] = [
    TransactionStatus::Scheduled as i16,
    TransactionStatus::Waiting as i16,
    TransactionStatus::Late as i16,
];

/// Drives borrow transactions through their lifecycle.
pub struct TransactionRepo;

impl TransactionRepo {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Find a transaction by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Transaction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM transactions WHERE id = $1");
        sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A user's active transactions (scheduled, waiting, or late), newest
    /// pickup first.
    pub async fn list_active_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM transactions \
             WHERE user_id = $1 AND status_id = ANY($2) \
             ORDER BY scheduled_pickup_time DESC"
        );
        sqlx::query_as::<_, Transaction>(&query)
            .bind(user_id)
            .bind(&ACTIVE_STATUSES[..])
            .fetch_all(pool)
            .await
    }

    /// One page of a user's full transaction history, newest pickup first.
    pub async fn history_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<TransactionPage, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM transactions \
             WHERE user_id = $1 \
             ORDER BY scheduled_pickup_time DESC \
             LIMIT $2 OFFSET $3"
        );
        let transactions = sqlx::query_as::<_, Transaction>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(TransactionPage {
            transactions,
            total,
            limit,
            offset,
        })
    }

    // -----------------------------------------------------------------------
    // Create borrow
    // -----------------------------------------------------------------------

    /// Create a borrow transaction: take a copy, pick the first free locker
    /// for the pickup window, insert the transaction and its pickup
    /// schedule. One database transaction end to end.
    pub async fn create_borrow(
        pool: &PgPool,
        user_id: DbId,
        input: &BorrowRequest,
        policy: &GracePolicy,
    ) -> Result<BorrowOutcome, sqlx::Error> {
        let window = TimeWindow {
            start: input.pickup_time,
            end: input.pickup_time + policy.locker_window,
        };

        let mut tx = pool.begin().await?;

        // Inventory first: the conditional decrement doubles as both the
        // existence check and the availability guard.
        if BookRepo::adjust_availability(&mut *tx, input.book_id, -1)
            .await?
            .is_none()
        {
            let exists = BookRepo::exists(&mut *tx, input.book_id).await?;
            return Ok(if exists {
                BorrowOutcome::BookUnavailable
            } else {
                BorrowOutcome::BookNotFound
            });
        }

        let Some(locker) = Self::claim_free_locker(&mut tx, &window, None).await? else {
            return Ok(BorrowOutcome::NoLockerAvailable);
        };

        let query = format!(
            "INSERT INTO transactions \
                 (user_id, book_id, locker_id, transaction_type, status_id, \
                  scheduled_pickup_time, scheduled_return_time) \
             VALUES ($1, $2, $3, 'borrow', $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let transaction = sqlx::query_as::<_, Transaction>(&query)
            .bind(user_id)
            .bind(input.book_id)
            .bind(locker.id)
            .bind(TransactionStatus::Scheduled.id())
            .bind(input.pickup_time)
            .bind(input.return_time)
            .fetch_one(&mut *tx)
            .await?;

        let reserve = ReserveLocker {
            locker_id: locker.id,
            user_id,
            transaction_id: transaction.id,
            start_time: window.start,
            end_time: window.end,
        };
        // The advisory lock from claim_free_locker is still held, so the
        // conditional insert cannot lose a race here.
        let Some(schedule) = LockerScheduleRepo::reserve(&mut *tx, &reserve).await? else {
            return Ok(BorrowOutcome::NoLockerAvailable);
        };

        tx.commit().await?;
        Ok(BorrowOutcome::Created {
            transaction,
            locker,
            schedule,
        })
    }

    /// First-fit over the free lockers for `window`, taking the per-locker
    /// advisory lock and re-checking overlap under it. `preferred` is tried
    /// before the rest of the fleet.
    ///
    /// Returns the claimed locker with its advisory lock held by `tx`; the
    /// caller must insert the schedule before committing.
    async fn claim_free_locker(
        tx: &mut PgTx<'_, Postgres>,
        window: &TimeWindow,
        preferred: Option<DbId>,
    ) -> Result<Option<Locker>, sqlx::Error> {
        let mut candidates = LockerRepo::find_available(&mut **tx, window).await?;
        if let Some(preferred) = preferred {
            candidates.sort_by_key(|locker| (locker.id != preferred, locker.id));
        }

        for locker in candidates {
            if !LockerScheduleRepo::try_lock_locker(&mut **tx, locker.id).await? {
                // Another flow is mid-claim on this locker; try the next one.
                continue;
            }
            let busy =
                LockerScheduleRepo::is_busy(&mut **tx, locker.id, window.start, window.end).await?;
            if !busy {
                return Ok(Some(locker));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Confirm pickup
    // -----------------------------------------------------------------------

    /// Confirm that the borrower has taken the book from the locker.
    ///
    /// Accepts only within `[scheduled_pickup_time, scheduled_pickup_time +
    /// pickup_grace]` (both ends inclusive).
    pub async fn confirm_pickup(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
        now: Timestamp,
        policy: &GracePolicy,
    ) -> Result<PickupOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(transaction) = Self::fetch_for_update(&mut tx, id, user_id).await? else {
            return Ok(PickupOutcome::NotFound);
        };

        if transaction.status_id != TransactionStatus::Scheduled.id() {
            return Ok(PickupOutcome::InvalidState(transaction.status_id));
        }

        match check_pickup_timing(now, transaction.scheduled_pickup_time, policy) {
            Err(PickupTiming::NotYetOpen) => return Ok(PickupOutcome::TooEarly),
            Err(PickupTiming::GraceExpired) => return Ok(PickupOutcome::GraceExpired),
            Ok(()) => {}
        }

        let query = format!(
            "UPDATE transactions \
             SET status_id = $2, actual_pickup_time = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(TransactionStatus::Waiting.id())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PickupOutcome::Confirmed(updated))
    }

    // -----------------------------------------------------------------------
    // Confirm return
    // -----------------------------------------------------------------------

    /// Confirm that the borrower has dropped the book back into a locker.
    ///
    /// Accepted while `waiting`, and also while `late` with no recorded
    /// return — an overdue book still has to come back. Within the return
    /// grace (inclusive) the transaction finishes; past it (or already
    /// swept late) it stays `late`. A drop-off schedule is reserved for
    /// `[now, now + locker_window)`, preferring the pickup locker.
    pub async fn confirm_return(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
        now: Timestamp,
        policy: &GracePolicy,
    ) -> Result<ReturnOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(transaction) = Self::fetch_for_update(&mut tx, id, user_id).await? else {
            return Ok(ReturnOutcome::NotFound);
        };

        let waiting = transaction.status_id == TransactionStatus::Waiting.id();
        let late_unreturned = transaction.status_id == TransactionStatus::Late.id()
            && transaction.actual_return_time.is_none();
        if !waiting && !late_unreturned {
            return Ok(ReturnOutcome::InvalidState(transaction.status_id));
        }

        let status = if late_unreturned {
            TransactionStatus::Late
        } else {
            match classify_return(now, transaction.scheduled_return_time, policy) {
                ReturnClass::OnTime => TransactionStatus::Finished,
                ReturnClass::Overdue => TransactionStatus::Late,
            }
        };

        if BookRepo::adjust_availability(&mut *tx, transaction.book_id, 1)
            .await?
            .is_none()
        {
            return Ok(ReturnOutcome::InventoryInconsistent);
        }

        let window = TimeWindow {
            start: now,
            end: now + policy.locker_window,
        };
        let Some(drop_locker) =
            Self::claim_free_locker(&mut tx, &window, Some(transaction.locker_id)).await?
        else {
            return Ok(ReturnOutcome::NoLockerAvailable);
        };
        let reserve = ReserveLocker {
            locker_id: drop_locker.id,
            user_id,
            transaction_id: id,
            start_time: window.start,
            end_time: window.end,
        };
        let Some(drop_schedule) = LockerScheduleRepo::reserve(&mut *tx, &reserve).await? else {
            return Ok(ReturnOutcome::NoLockerAvailable);
        };

        let query = format!(
            "UPDATE transactions \
             SET status_id = $2, actual_return_time = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(status.id())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ReturnOutcome::Returned {
            transaction: updated,
            drop_schedule,
            late: status == TransactionStatus::Late,
        })
    }

    // -----------------------------------------------------------------------
    // Cancel
    // -----------------------------------------------------------------------

    /// Cancel a transaction that has not been picked up: soft-cancel its
    /// schedules, put the copy back, flip the status.
    pub async fn cancel(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
        book_id: DbId,
    ) -> Result<CancelOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(transaction) = Self::fetch_for_update(&mut tx, id, user_id).await? else {
            return Ok(CancelOutcome::NotFound);
        };

        if transaction.book_id != book_id {
            return Ok(CancelOutcome::BookMismatch);
        }
        if transaction.actual_pickup_time.is_some() {
            return Ok(CancelOutcome::AlreadyPickedUp);
        }
        if transaction.status_id != TransactionStatus::Scheduled.id() {
            return Ok(CancelOutcome::InvalidState(transaction.status_id));
        }

        LockerScheduleRepo::cancel_by_transaction(&mut *tx, id).await?;

        if BookRepo::adjust_availability(&mut *tx, transaction.book_id, 1)
            .await?
            .is_none()
        {
            return Ok(CancelOutcome::InventoryInconsistent);
        }

        let query = format!(
            "UPDATE transactions \
             SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(TransactionStatus::Canceled.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CancelOutcome::Cancelled(updated))
    }

    // -----------------------------------------------------------------------
    // Background sweeps
    // -----------------------------------------------------------------------

    /// Flag unreturned transactions whose return grace has elapsed as late.
    ///
    /// One set-based statement; returns the flagged rows so the caller can
    /// publish events for each.
    pub async fn sweep_overdue(
        pool: &PgPool,
        now: Timestamp,
        policy: &GracePolicy,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let cutoff = now - policy.return_grace;
        let query = format!(
            "UPDATE transactions \
             SET status_id = $1, updated_at = NOW() \
             WHERE status_id = $2 \
               AND actual_return_time IS NULL \
               AND scheduled_return_time < $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Transaction>(&query)
            .bind(TransactionStatus::Late.id())
            .bind(TransactionStatus::Waiting.id())
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Cancel reservations that were never picked up within the pickup
    /// grace window, releasing the book copy and the locker.
    pub async fn sweep_expired_pickups(
        pool: &PgPool,
        now: Timestamp,
        policy: &GracePolicy,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let cutoff = now - policy.pickup_grace;
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE transactions \
             SET status_id = $1, updated_at = NOW() \
             WHERE status_id = $2 \
               AND actual_pickup_time IS NULL \
               AND scheduled_pickup_time < $3 \
             RETURNING {COLUMNS}"
        );
        let expired = sqlx::query_as::<_, Transaction>(&query)
            .bind(TransactionStatus::Canceled.id())
            .bind(TransactionStatus::Scheduled.id())
            .bind(cutoff)
            .fetch_all(&mut *tx)
            .await?;

        for transaction in &expired {
            LockerScheduleRepo::cancel_by_transaction(&mut *tx, transaction.id).await?;
            if BookRepo::adjust_availability(&mut *tx, transaction.book_id, 1)
                .await?
                .is_none()
            {
                // A full shelf here means the inventory was already off for
                // this title; the expiry itself still stands.
                tracing::warn!(
                    transaction_id = transaction.id,
                    book_id = transaction.book_id,
                    "Expiry sweep could not release a copy (quantity already at total)"
                );
            }
        }

        tx.commit().await?;
        Ok(expired)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Fetch the caller's transaction row with a row lock, or `None` if it
    /// does not exist or belongs to someone else (not distinguished, so a
    /// foreign id does not leak existence).
    async fn fetch_for_update(
        tx: &mut PgTx<'_, Postgres>,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2 FOR UPDATE");
        sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
    }
}
