//! Repository for the append-only `events` audit table.

use sqlx::PgPool;

use bibliobox_core::types::DbId;

use crate::models::event::Event;

const COLUMNS: &str = "\
    id, event_type, source_entity_type, source_entity_id, actor_user_id, \
    payload, created_at";

/// Maximum page size for event listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for event listing.
const DEFAULT_LIMIT: i64 = 50;

/// Insert and read operations for persisted platform events.
pub struct EventRepo;

impl EventRepo {
    /// Append one event row.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        actor_user_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO events \
                 (event_type, source_entity_type, source_entity_id, actor_user_id, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(actor_user_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Newest-first page of events, optionally filtered by type.
    pub async fn list(
        pool: &PgPool,
        event_type: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE ($1::TEXT IS NULL OR event_type = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(event_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
