use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use lendit::engine::Engine;
use lendit::http::router;
use lendit::model::Ms;

const H: Ms = 3_600_000; // 1 hour in ms

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("lendit_test_api");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn app(name: &str) -> Router {
    let engine = Arc::new(Engine::new(test_wal_path(name), false).unwrap());
    router(engine)
}

fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header("X-Sharer-User-Id", id.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// POST /users helper returning the new user's id.
async fn create_user(app: &Router, name: &str, email: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn create_item(app: &Router, owner: i64, name: &str, available: bool) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/items",
        Some(owner),
        Some(json!({ "name": name, "description": "well used", "available": available })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn full_booking_flow() {
    let app = app("full_flow.wal");
    let owner = create_user(&app, "Owner", "owner@example.com").await;
    let booker = create_user(&app, "Booker", "booker@example.com").await;
    let stranger = create_user(&app, "Stranger", "stranger@example.com").await;
    let item = create_item(&app, owner, "Drill", true).await;

    let now = now_ms();
    let (status, booking) = send(
        &app,
        "POST",
        "/bookings",
        Some(booker),
        Some(json!({ "item_id": item, "start": now + 24 * H, "end": now + 48 * H })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "WAITING");
    let booking_id = booking["id"].as_i64().unwrap();

    // Only the owner may decide
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/bookings/{booking_id}?approved=true"),
        Some(booker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, decided) = send(
        &app,
        "PATCH",
        &format!("/bookings/{booking_id}?approved=true"),
        Some(owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "APPROVED");

    // Visible to booker and owner, hidden from anyone else
    let (status, _) = send(&app, "GET", &format!("/bookings/{booking_id}"), Some(booker), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/bookings/{booking_id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send(&app, "GET", &format!("/bookings/{booking_id}"), Some(stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // FUTURE listing for the booker contains the booking
    let (status, listed) = send(&app, "GET", "/bookings?state=FUTURE", Some(booker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"].as_i64().unwrap(), booking_id);

    // Owner-side listing sees it too
    let (status, listed) = send(&app, "GET", "/bookings/owner", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_validation_and_mapping() {
    let app = app("booking_validation.wal");
    let owner = create_user(&app, "Owner", "owner@example.com").await;
    let booker = create_user(&app, "Booker", "booker@example.com").await;
    let item = create_item(&app, owner, "Drill", true).await;
    let broken = create_item(&app, owner, "Broken saw", false).await;

    let now = now_ms();

    // end before start → 400 before the engine is reached
    let (status, body) = send(
        &app,
        "POST",
        "/bookings",
        Some(booker),
        Some(json!({ "item_id": item, "start": now + 2 * H, "end": now + H })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("end"));

    // unavailable item → 400
    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(booker),
        Some(json!({ "item_id": broken, "start": now + H, "end": now + 2 * H })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unknown item → 404
    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(booker),
        Some(json!({ "item_id": 999, "start": now + H, "end": now + 2 * H })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // unknown booker → 404
    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(999),
        Some(json!({ "item_id": item, "start": now + H, "end": now + 2 * H })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // missing identity header → 400
    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        None,
        Some(json!({ "item_id": item, "start": now + H, "end": now + 2 * H })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unknown state value → 400
    let (status, body) = send(&app, "GET", "/bookings?state=SOMEDAY", Some(booker), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("SOMEDAY"));

    // unknown booking id → 404
    let (status, _) = send(&app, "GET", "/bookings/12345", Some(booker), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_crud_and_conflicts() {
    let app = app("user_crud.wal");
    let user = create_user(&app, "A", "a@example.com").await;

    // Duplicate email → 409
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": "B", "email": "a@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Malformed email → 400
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": "B", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Blank name → 400
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "name": "  ", "email": "b@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Patch just the name
    let (status, patched) = send(
        &app,
        "PATCH",
        &format!("/users/{user}"),
        None,
        Some(json!({ "name": "A2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["name"], "A2");
    assert_eq!(patched["email"], "a@example.com");

    let (status, fetched) = send(&app, "GET", &format!("/users/{user}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "A2");

    let (status, _) = send(&app, "DELETE", &format!("/users/{user}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/users/{user}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_update_search_and_detail() {
    let app = app("item_flow.wal");
    let owner = create_user(&app, "Owner", "owner@example.com").await;
    let other = create_user(&app, "Other", "other@example.com").await;
    let item = create_item(&app, owner, "Cordless drill", true).await;
    create_item(&app, owner, "Ladder", true).await;

    // Non-owner may not update
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/items/{item}"),
        Some(other),
        Some(json!({ "available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Owner flips availability
    let (status, patched) = send(
        &app,
        "PATCH",
        &format!("/items/{item}"),
        Some(owner),
        Some(json!({ "available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["available"], false);

    // Search skips the now-unavailable drill
    let (status, found) = send(&app, "GET", "/items/search?text=drill", Some(other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(found.as_array().unwrap().is_empty());

    let (status, found) = send(&app, "GET", "/items/search?text=LADDER", Some(other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    // Owner's listing has both items
    let (status, listed) = send(&app, "GET", "/items", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);

    // Detail view carries the annotation fields, absent without bookings
    let (status, detail) = send(&app, "GET", &format!("/items/{item}"), Some(other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(detail["last_booking"].is_null());
    assert!(detail["next_booking"].is_null());
    assert!(detail["comments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn comment_gate_over_http() {
    let app = app("comment_flow.wal");
    let owner = create_user(&app, "Owner", "owner@example.com").await;
    let booker = create_user(&app, "Booker", "booker@example.com").await;
    let item = create_item(&app, owner, "Drill", true).await;

    // No booking history → 400
    let (status, _) = send(
        &app,
        "POST",
        &format!("/items/{item}/comment"),
        Some(booker),
        Some(json!({ "text": "nice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A completed (past) booking opens the gate
    let now = now_ms();
    let (status, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(booker),
        Some(json!({ "item_id": item, "start": now - 3 * H, "end": now - 2 * H })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, comment) = send(
        &app,
        "POST",
        &format!("/items/{item}/comment"),
        Some(booker),
        Some(json!({ "text": "nice drill" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["text"], "nice drill");
    assert_eq!(comment["author_name"], "Booker");

    // The comment shows up in the item detail
    let (status, detail) = send(&app, "GET", &format!("/items/{item}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let comments = detail["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "nice drill");

    // The past booking also annotates nothing (neither ongoing nor future)
    assert!(detail["last_booking"].is_null());
    assert!(detail["next_booking"].is_null());
}

#[tokio::test]
async fn annotations_reflect_ongoing_and_upcoming_bookings() {
    let app = app("annotations_http.wal");
    let owner = create_user(&app, "Owner", "owner@example.com").await;
    let booker = create_user(&app, "Booker", "booker@example.com").await;
    let item = create_item(&app, owner, "Drill", true).await;

    let now = now_ms();
    for (start, end) in [(now - H, now + H), (now + 4 * H, now + 5 * H)] {
        let (status, _) = send(
            &app,
            "POST",
            "/bookings",
            Some(booker),
            Some(json!({ "item_id": item, "start": start, "end": end })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, detail) = send(&app, "GET", &format!("/items/{item}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let last = detail["last_booking"].as_i64().unwrap();
    let next = detail["next_booking"].as_i64().unwrap();
    assert!(last > now);
    assert_eq!(next, now + 4 * H);
}
