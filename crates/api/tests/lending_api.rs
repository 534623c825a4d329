//! HTTP-level integration tests for the lending API: auth enforcement,
//! the borrow → pickup → return flow, cancellation, capacity errors, and
//! the error envelope shape.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{auth_token, body_json, get_auth, post_json, post_json_auth};
use sqlx::PgPool;

use bibliobox_db::models::book::CreateBook;
use bibliobox_db::repositories::BookRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MEMBER: i64 = 7;

/// Create a book directly in the database and return its id.
async fn seed_book(pool: &PgPool, title: &str, copies: i32) -> i64 {
    BookRepo::create(
        pool,
        &CreateBook {
            title: title.to_string(),
            author: None,
            total_quantity: copies,
        },
    )
    .await
    .expect("book creation should succeed")
    .id
}

/// A borrow body whose pickup window is already open, so confirm-pickup
/// and confirm-return can run against the real clock.
fn open_borrow_body(book_id: i64) -> serde_json::Value {
    let now = Utc::now();
    serde_json::json!({
        "book_id": book_id,
        "pickup_time": (now - Duration::minutes(5)).to_rfc3339(),
        "return_time": (now + Duration::hours(4)).to_rfc3339(),
    })
}

/// Borrow via the API and return the transaction id.
async fn borrow(app: axum::Router, book_id: i64, token: &str) -> i64 {
    let response = post_json_auth(
        app,
        "/api/v1/transactions/borrow",
        open_borrow_body(book_id),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["transaction"]["id"]
        .as_i64()
        .expect("transaction id should be an integer")
}

// ---------------------------------------------------------------------------
// Auth enforcement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn borrow_requires_authentication(pool: PgPool) {
    let book_id = seed_book(&pool, "Dune", 1).await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/transactions/borrow",
        open_borrow_body(book_id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_token_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/books", "not-a-token").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn book_creation_is_admin_only(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = serde_json::json!({ "title": "Dune", "total_quantity": 3 });

    let response = post_json_auth(
        app.clone(),
        "/api/v1/books",
        body.clone(),
        &auth_token(MEMBER, "member"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app, "/api/v1/books", body, &auth_token(1, "admin")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["available_quantity"], 3);
}

// ---------------------------------------------------------------------------
// Borrow -> pickup -> return
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_lending_flow_over_http(pool: PgPool) {
    let book_id = seed_book(&pool, "Dune", 1).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(MEMBER, "member");

    // Borrow: 201 with transaction + assigned locker.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/transactions/borrow",
        open_borrow_body(book_id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let transaction_id = json["data"]["transaction"]["id"].as_i64().unwrap();
    assert!(json["data"]["locker"]["id"].is_i64());
    assert_eq!(json["data"]["transaction"]["book_id"], book_id);

    // The copy is out.
    let book = BookRepo::find_by_id(&pool, book_id).await.unwrap().unwrap();
    assert_eq!(book.available_quantity, 0);

    // The locker shows up in the caller's active schedules.
    let response = get_auth(app.clone(), "/api/v1/locker-schedules/active", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Confirm pickup.
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/transactions/{transaction_id}/confirm-pickup"),
        serde_json::json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["actual_pickup_time"].is_string());

    // Confirm return: on time, copy restocked.
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/transactions/{transaction_id}/confirm-return"),
        serde_json::json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["late"], false);
    assert!(json["data"]["drop_locker_id"].is_i64());

    let book = BookRepo::find_by_id(&pool, book_id).await.unwrap().unwrap();
    assert_eq!(book.available_quantity, 1);

    // Nothing active anymore; history remembers the loan.
    let response = get_auth(app.clone(), "/api/v1/transactions/active", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let response = get_auth(app, "/api/v1/transactions/history", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn double_return_reports_invalid_transition(pool: PgPool) {
    let book_id = seed_book(&pool, "Dune", 1).await;
    let app = common::build_test_app(pool);
    let token = auth_token(MEMBER, "member");

    let transaction_id = borrow(app.clone(), book_id, &token).await;

    let pickup = format!("/api/v1/transactions/{transaction_id}/confirm-pickup");
    let ret = format!("/api/v1/transactions/{transaction_id}/confirm-return");

    post_json_auth(app.clone(), &pickup, serde_json::json!({}), &token).await;
    let first = post_json_auth(app.clone(), &ret, serde_json::json!({}), &token).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_json_auth(app, &ret, serde_json::json!({}), &token).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["code"], "INVALID_TRANSITION");
    // The message names the current state so the client can refresh.
    assert!(json["error"].as_str().unwrap().contains("finished"));
}

// ---------------------------------------------------------------------------
// Capacity errors
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn borrowing_an_exhausted_book_reports_capacity(pool: PgPool) {
    let book_id = seed_book(&pool, "Dune", 0).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/transactions/borrow",
        open_borrow_body(book_id),
        &auth_token(MEMBER, "member"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CAPACITY");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn borrowing_a_missing_book_reports_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/transactions/borrow",
        open_borrow_body(424242),
        &auth_token(MEMBER, "member"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_flow_and_guards(pool: PgPool) {
    let book_id = seed_book(&pool, "Dune", 1).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(MEMBER, "member");

    let transaction_id = borrow(app.clone(), book_id, &token).await;
    let cancel_uri = format!("/api/v1/transactions/{transaction_id}/cancel");

    // Wrong book id is caught before anything mutates.
    let response = post_json_auth(
        app.clone(),
        &cancel_uri,
        serde_json::json!({ "book_id": book_id + 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Real cancellation restocks the copy.
    let response = post_json_auth(
        app.clone(),
        &cancel_uri,
        serde_json::json!({ "book_id": book_id }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let book = BookRepo::find_by_id(&pool, book_id).await.unwrap().unwrap();
    assert_eq!(book.available_quantity, 1);

    // Cancelling again conflicts.
    let response = post_json_auth(
        app,
        &cancel_uri,
        serde_json::json!({ "book_id": book_id }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_after_pickup_conflicts_and_keeps_stock(pool: PgPool) {
    let book_id = seed_book(&pool, "Dune", 1).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(MEMBER, "member");

    let transaction_id = borrow(app.clone(), book_id, &token).await;
    post_json_auth(
        app.clone(),
        &format!("/api/v1/transactions/{transaction_id}/confirm-pickup"),
        serde_json::json!({}),
        &token,
    )
    .await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/transactions/{transaction_id}/cancel"),
        serde_json::json!({ "book_id": book_id }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    // The copy stays out.
    let book = BookRepo::find_by_id(&pool, book_id).await.unwrap().unwrap();
    assert_eq!(book.available_quantity, 0);
}

// ---------------------------------------------------------------------------
// Lockers and books surface
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn locker_fleet_and_availability_endpoints(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = auth_token(MEMBER, "member");

    let response = get_auth(app.clone(), "/api/v1/lockers", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let fleet = json["data"].as_array().unwrap().len();
    assert!(fleet > 0);

    // An empty calendar means everything is free.
    let time = Utc::now().to_rfc3339();
    let uri = format!("/api/v1/lockers/available?time={}", urlencode(&time));
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), fleet);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_book_yields_error_envelope(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get_auth(
        app,
        "/api/v1/books/999999",
        &auth_token(MEMBER, "member"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(json["error"].as_str().unwrap().contains("999999"));
}

/// Percent-encode the characters RFC 3339 timestamps put in query strings.
fn urlencode(value: &str) -> String {
    value.replace('+', "%2B").replace(':', "%3A")
}
