//! Locker entity model.
//!
//! Lockers are an immutable reference fleet seeded by migration; the core
//! never creates or destroys them.

use serde::Serialize;
use sqlx::FromRow;

use bibliobox_core::types::DbId;

/// A locker row from the `lockers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Locker {
    pub id: DbId,
    pub name: String,
}
