//! Book entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bibliobox_core::types::{DbId, Timestamp};

/// A book row from the `books` table.
///
/// Invariant (enforced by `ck_books_quantity_bounds` and the atomic
/// adjustment in `BookRepo`): `0 <= available_quantity <= total_quantity`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Book {
    pub id: DbId,
    pub title: String,
    pub author: Option<String>,
    pub available_quantity: i32,
    pub total_quantity: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new book title.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: Option<String>,
    pub total_quantity: i32,
}

/// DTO for an admin stock adjustment (`delta` copies, positive or negative).
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustQuantity {
    pub delta: i32,
}

/// Availability check result (computed, not a DB row).
#[derive(Debug, Clone, Serialize)]
pub struct BookAvailability {
    pub book: Book,
    pub is_available: bool,
}
