//! Repository for the `lockers` table — the availability resolver.

use sqlx::{PgExecutor, PgPool};

use bibliobox_core::interval::TimeWindow;
use bibliobox_core::types::DbId;

use crate::models::locker::Locker;
use crate::models::status::ScheduleStatus;

const COLUMNS: &str = "id, name";

/// Read operations over the fixed locker fleet.
pub struct LockerRepo;

impl LockerRepo {
    /// List the whole fleet in stable id order.
    pub async fn list(pool: &PgPool) -> Result<Vec<Locker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lockers ORDER BY id");
        sqlx::query_as::<_, Locker>(&query).fetch_all(pool).await
    }

    /// Find a locker by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Locker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lockers WHERE id = $1");
        sqlx::query_as::<_, Locker>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lockers with no live schedule overlapping `window`, in id order.
    ///
    /// The busy set is every non-cancelled schedule with
    /// `start_time < window.end AND end_time > window.start` (half-open
    /// overlap); the result is the fleet minus that set. Read-only: callers
    /// that go on to reserve must re-check under the per-locker advisory
    /// lock (see `LockerScheduleRepo`).
    pub async fn find_available(
        executor: impl PgExecutor<'_>,
        window: &TimeWindow,
    ) -> Result<Vec<Locker>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM lockers l \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM locker_schedules s \
                 WHERE s.locker_id = l.id \
                   AND s.status_id = $3 \
                   AND s.start_time < $2 \
                   AND s.end_time > $1 \
             ) \
             ORDER BY l.id"
        );
        sqlx::query_as::<_, Locker>(&query)
            .bind(window.start)
            .bind(window.end)
            .bind(ScheduleStatus::Scheduled.id())
            .fetch_all(executor)
            .await
    }
}
