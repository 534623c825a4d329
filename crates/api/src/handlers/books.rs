//! Handlers for the `/books` resource — the inventory surface.
//!
//! Reads are open to any authenticated user; stock management (create,
//! adjust) is admin-only. Every quantity change goes through
//! `BookRepo::adjust_availability` — there is no other write path.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use bibliobox_core::error::CoreError;
use bibliobox_core::types::DbId;
use bibliobox_db::models::book::{AdjustQuantity, CreateBook};
use bibliobox_db::repositories::BookRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/books
///
/// List books ordered by title with `limit`/`offset` pagination.
pub async fn list_books(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let books = BookRepo::list(&state.pool, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: books }))
}

/// GET /api/v1/books/{id}
pub async fn get_book(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(book_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let book = BookRepo::find_by_id(&state.pool, book_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Book",
            id: book_id,
        }))?;
    Ok(Json(DataResponse { data: book }))
}

/// GET /api/v1/books/{id}/availability
///
/// The book plus a computed `is_available` flag.
pub async fn check_availability(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(book_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let availability = BookRepo::check_availability(&state.pool, book_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Book",
            id: book_id,
        }))?;
    Ok(Json(DataResponse { data: availability }))
}

/// POST /api/v1/books
///
/// Register a new title (admin only). Stock starts fully available.
pub async fn create_book(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateBook>,
) -> AppResult<impl IntoResponse> {
    auth.require_admin()?;

    if input.total_quantity < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "total_quantity must not be negative".into(),
        )));
    }

    let book = BookRepo::create(&state.pool, &input).await?;

    tracing::info!(book_id = book.id, title = %book.title, user_id = auth.user_id, "Book created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: book })))
}

/// POST /api/v1/books/{id}/adjust
///
/// Adjust available stock by `delta` (admin only). Fails with `CAPACITY`
/// if the adjustment would leave the counter outside
/// `0..=total_quantity`.
pub async fn adjust_quantity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(book_id): Path<DbId>,
    Json(input): Json<AdjustQuantity>,
) -> AppResult<impl IntoResponse> {
    auth.require_admin()?;

    let new_quantity = BookRepo::adjust_availability(&state.pool, book_id, input.delta).await?;

    match new_quantity {
        Some(available_quantity) => {
            tracing::info!(
                book_id,
                delta = input.delta,
                available_quantity,
                user_id = auth.user_id,
                "Book availability adjusted"
            );
            Ok(Json(DataResponse {
                data: serde_json::json!({ "available_quantity": available_quantity }),
            }))
        }
        None => {
            if BookRepo::exists(&state.pool, book_id).await? {
                Err(AppError::Core(CoreError::Capacity(format!(
                    "Adjusting by {} would leave availability out of range",
                    input.delta
                ))))
            } else {
                Err(AppError::Core(CoreError::NotFound {
                    entity: "Book",
                    id: book_id,
                }))
            }
        }
    }
}
