use std::sync::Arc;
use std::time::Instant;

use axum::extract::{FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::error;

use crate::engine::{Engine, EngineError};
use crate::model::*;

const HEADER_SHARER_USER_ID: &str = "X-Sharer-User-Id";

/// The caller's identity, already resolved upstream and carried as a numeric
/// id in the `X-Sharer-User-Id` header.
pub struct SharerId(pub i64);

impl<S> FromRequestParts<S> for SharerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(HEADER_SHARER_USER_ID)
            .ok_or_else(|| ApiError::bad_request("missing X-Sharer-User-Id header"))?;
        let id = header
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::bad_request("invalid X-Sharer-User-Id header"))?;
        Ok(Self(id))
    }
}

/// Transport-level error: an engine failure mapped to a status code, or an
/// input-format rejection raised before the engine is reached.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::UserNotFound(_)
            | EngineError::ItemNotFound(_)
            | EngineError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            EngineError::ItemUnavailable(_)
            | EngineError::BookingOverlap { .. }
            | EngineError::CommentRejected { .. }
            | EngineError::LimitExceeded(_) => StatusCode::BAD_REQUEST,
            EngineError::DuplicateEmail(_) => StatusCode::CONFLICT,
            EngineError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("engine failure: {err}");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

// ── Input-format validation ──────────────────────────────

fn require_not_blank(value: &str, field: &'static str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be blank")));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), ApiError> {
    require_not_blank(value, "email")?;
    let well_formed = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };
    if !well_formed {
        return Err(ApiError::bad_request("email must match name@domain.xx"));
    }
    Ok(())
}

/// Blank `Some` values in a patch are rejected; `None` means "leave as is".
fn reject_blank(value: &Option<String>, field: &'static str) -> Result<(), ApiError> {
    if let Some(v) = value {
        require_not_blank(v, field)?;
    }
    Ok(())
}

fn parse_state(state: Option<String>) -> Result<BookingSearchState, ApiError> {
    let raw = state.unwrap_or_else(|| "ALL".to_string());
    BookingSearchState::parse(&raw)
        .ok_or_else(|| ApiError::bad_request(format!("unknown state: {raw}")))
}

// ── Request shapes ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateItemRequest {
    name: String,
    description: String,
    available: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateItemRequest {
    name: Option<String>,
    description: Option<String>,
    available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    item_id: i64,
    start: Ms,
    end: Ms,
}

#[derive(Debug, Deserialize)]
struct CreateCommentRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct StateQuery {
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApprovedQuery {
    approved: bool,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    text: String,
}

// ── Handlers ─────────────────────────────────────────────

async fn create_user(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_not_blank(&req.name, "name")?;
    require_email(&req.email)?;
    let user = engine.create_user(req.name, req.email).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(engine): State<Arc<Engine>>) -> Json<Vec<User>> {
    Json(engine.list_users())
}

async fn get_user(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(engine.get_user(id)?))
}

async fn update_user(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    reject_blank(&req.name, "name")?;
    if let Some(ref email) = req.email {
        require_email(email)?;
    }
    Ok(Json(engine.update_user(id, req.name, req.email).await?))
}

async fn delete_user(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    engine.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_item(
    SharerId(user_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_not_blank(&req.name, "name")?;
    require_not_blank(&req.description, "description")?;
    let item = engine
        .create_item(user_id, req.name, req.description, req.available)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn list_items(
    SharerId(user_id): SharerId,
    State(engine): State<Arc<Engine>>,
) -> Json<Vec<Item>> {
    Json(engine.items_by_owner(user_id))
}

async fn search_items(
    SharerId(_user_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    Ok(Json(engine.search_items(&query.text)?))
}

async fn get_item(
    SharerId(_user_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
) -> Result<Json<ItemDetail>, ApiError> {
    Ok(Json(engine.item_detail(id)?))
}

async fn update_item(
    SharerId(user_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    reject_blank(&req.name, "name")?;
    reject_blank(&req.description, "description")?;
    Ok(Json(
        engine
            .update_item(id, user_id, req.name, req.description, req.available)
            .await?,
    ))
}

async fn add_comment(
    SharerId(author_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Path(item_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<CommentView>, ApiError> {
    require_not_blank(&req.text, "text")?;
    Ok(Json(engine.add_comment(author_id, item_id, req.text).await?))
}

async fn create_booking(
    SharerId(booker_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingView>, ApiError> {
    if req.end <= req.start {
        return Err(ApiError::bad_request("end must be after start"));
    }
    let span = Span::new(req.start, req.end);
    Ok(Json(
        engine.create_booking(booker_id, req.item_id, span).await?,
    ))
}

async fn get_booking(
    SharerId(requester_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
) -> Result<Json<BookingView>, ApiError> {
    Ok(Json(engine.get_booking(id, requester_id)?))
}

async fn decide_booking(
    SharerId(owner_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Path(id): Path<i64>,
    Query(query): Query<ApprovedQuery>,
) -> Result<Json<BookingView>, ApiError> {
    Ok(Json(engine.set_approval(id, owner_id, query.approved).await?))
}

async fn list_bookings(
    SharerId(user_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Query(query): Query<StateQuery>,
) -> Result<Json<Vec<BookingView>>, ApiError> {
    let state = parse_state(query.state)?;
    Ok(Json(engine.list_bookings(user_id, BookingRole::Booker, state)?))
}

async fn list_owner_bookings(
    SharerId(user_id): SharerId,
    State(engine): State<Arc<Engine>>,
    Query(query): Query<StateQuery>,
) -> Result<Json<Vec<BookingView>>, ApiError> {
    let state = parse_state(query.state)?;
    Ok(Json(engine.list_bookings(user_id, BookingRole::Owner, state)?))
}

async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    metrics::counter!(
        crate::observability::REQUESTS_TOTAL,
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(crate::observability::REQUEST_DURATION_SECONDS)
        .record(start.elapsed().as_secs_f64());
    response
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/items", post(create_item).get(list_items))
        .route("/items/search", get(search_items))
        .route("/items/{id}", get(get_item).patch(update_item))
        .route("/items/{id}/comment", post(add_comment))
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/owner", get(list_owner_bookings))
        .route("/bookings/{id}", get(get_booking).patch(decide_booking))
        .layer(axum::middleware::from_fn(track_requests))
        .with_state(engine)
}
