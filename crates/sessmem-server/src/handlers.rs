use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sessmem_client::SessionCache;
use sessmem_client::wire::{self, BLACKLISTED_HEADER, ErrorBody, IssueCodeQuery, LAST_SEEN_HEADER};
use sessmem_sessions::{CacheError, VerifyCodeRequest};
use uuid::Uuid;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn SessionCache>,
}

/// A [`CacheError`] rendered as a JSON error response.
///
/// The status is normally the error's own; a rejected request body may
/// carry axum's more specific status instead.
#[derive(Debug)]
pub struct ApiError {
    error: CacheError,
    status: StatusCode,
}

impl ApiError {
    fn with_status(error: CacheError, status: StatusCode) -> Self {
        Self { error, status }
    }
}

impl From<CacheError> for ApiError {
    fn from(error: CacheError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::with_status(error, status)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let error = CacheError::invalid_request(rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::with_status(error, StatusCode::PAYLOAD_TOO_LARGE)
        } else {
            error.into()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.error.is_client_error() {
            tracing::debug!(kind = self.error.kind(), error = %self.error, "request rejected");
        } else {
            tracing::error!(kind = self.error.kind(), error = %self.error, "request failed");
        }
        (self.status, Json(ErrorBody::from(&self.error))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn is_blacklisted(
    State(state): State<AppState>,
    Path(signature): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let signature = wire::decode_signature(&signature)?;
    let blacklisted = state.cache.is_blacklisted(&signature).await?;
    let value = if blacklisted { "true" } else { "false" };
    Ok((StatusCode::OK, [(BLACKLISTED_HEADER, value)]))
}

pub async fn blacklist(
    State(state): State<AppState>,
    Path(signature): Path<String>,
) -> ApiResult<StatusCode> {
    let signature = wire::decode_signature(&signature)?;
    state.cache.blacklist(&signature).await?;
    Ok(StatusCode::OK)
}

pub async fn get_last_seen(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    let seen = state.cache.get_last_seen(user_id).await?;
    Ok((
        StatusCode::OK,
        [(LAST_SEEN_HEADER, seen.unix_timestamp().to_string())],
    ))
}

pub async fn save_last_seen(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(&user_id)?;
    state.cache.save_last_seen(user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn issue_code(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<IssueCodeQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    let Query(query) =
        query.map_err(|e| CacheError::invalid_request(format!("email query parameter: {e}")))?;
    let data = state.cache.issue_code(user_id, &query.email).await?;
    Ok((StatusCode::OK, Json(data)))
}

pub async fn pending_code(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    match state.cache.pending_code(user_id).await? {
        Some(data) => Ok((StatusCode::OK, Json(data))),
        None => Err(CacheError::NotFound.into()),
    }
}

pub async fn verify_code(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(&user_id)?;
    let Json(req) = body?;
    state
        .cache
        .verify_code(user_id, &req.new_email, &req.code)
        .await?;
    Ok(StatusCode::OK)
}

fn parse_user_id(raw: &str) -> Result<Uuid, CacheError> {
    Uuid::parse_str(raw)
        .map_err(|e| CacheError::invalid_request(format!("invalid user id {raw:?}: {e}")))
}
