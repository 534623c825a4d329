//! Repository for the `books` table — the inventory ledger.
//!
//! `available_quantity` is mutated ONLY through [`BookRepo::adjust_availability`],
//! a single conditional `UPDATE` whose row count tells the caller whether the
//! adjustment fit the `0..=total_quantity` bounds. No code path reads the
//! counter and writes it back.

use sqlx::{PgExecutor, PgPool};

use bibliobox_core::types::DbId;

use crate::models::book::{Book, BookAvailability, CreateBook};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, title, author, available_quantity, total_quantity, created_at, updated_at";

/// Maximum page size for book listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for book listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides operations on the book inventory.
pub struct BookRepo;

impl BookRepo {
    /// Register a new title. Stock starts fully available.
    pub async fn create(pool: &PgPool, input: &CreateBook) -> Result<Book, sqlx::Error> {
        let query = format!(
            "INSERT INTO books (title, author, available_quantity, total_quantity) \
             VALUES ($1, $2, $3, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(&input.title)
            .bind(&input.author)
            .bind(input.total_quantity)
            .fetch_one(pool)
            .await
    }

    /// Find a book by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Book>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM books WHERE id = $1");
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List books ordered by title, with limit/offset pagination.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Book>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!("SELECT {COLUMNS} FROM books ORDER BY title, id LIMIT $1 OFFSET $2");
        sqlx::query_as::<_, Book>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Check whether a book has at least one available copy.
    pub async fn check_availability(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BookAvailability>, sqlx::Error> {
        let book = Self::find_by_id(pool, id).await?;
        Ok(book.map(|book| {
            let is_available = book.available_quantity > 0;
            BookAvailability { book, is_available }
        }))
    }

    /// Atomically adjust `available_quantity` by `delta` (negative to take a
    /// copy, positive to put one back).
    ///
    /// The bounds check and the write are one statement, so concurrent
    /// adjustments on the same book serialize on the row and the counter can
    /// never leave `0..=total_quantity`. Returns the new quantity, or `None`
    /// if no row matched — the book is missing or the adjustment would go
    /// out of range (callers distinguish via [`exists`](Self::exists)).
    pub async fn adjust_availability(
        executor: impl PgExecutor<'_>,
        id: DbId,
        delta: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE books \
             SET available_quantity = available_quantity + $2, updated_at = NOW() \
             WHERE id = $1 \
               AND available_quantity + $2 BETWEEN 0 AND total_quantity \
             RETURNING available_quantity",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await
    }

    /// Whether a book row exists at all (used to tell "missing" apart from
    /// "adjustment out of range" after a failed [`adjust_availability`](Self::adjust_availability)).
    pub async fn exists(executor: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }
}
