//! Persisted platform event model.

use serde::Serialize;
use sqlx::FromRow;

use bibliobox_core::types::{DbId, Timestamp};

/// A row from the append-only `events` audit table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
