//! REST API handlers.
//!
//! Each handler reads/writes via `RecordStore` and returns JSON responses.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use testpool_state::*;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Map a store error onto the HTTP taxonomy: 404 for missing records,
/// 409 for duplicate document numbers, 400 for rejected payloads, 500 for
/// everything the persistence layer can throw.
fn store_error(err: StateError) -> axum::response::Response {
    let status = match &err {
        StateError::NotFound(_) => StatusCode::NOT_FOUND,
        StateError::Conflict(_) => StatusCode::CONFLICT,
        StateError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&err.to_string(), status).into_response()
}

/// Split a comma-separated tag list, dropping empty segments.
fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

// ── Records ────────────────────────────────────────────────────

/// Query parameters for `GET /records`.
#[derive(serde::Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub status: Option<RecordStatus>,
    pub uc_status: Option<UcStatus>,
    pub financial_status: Option<String>,
    pub document_type: Option<String>,
    /// Comma-separated tags; the record must carry all of them.
    pub tags: Option<String>,
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

/// GET /api/v1/records
pub async fn list_records(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filter = ListFilter {
        region: query.region,
        status: query.status,
        uc_status: query.uc_status,
        financial_status: query.financial_status,
        document_type: query.document_type,
        tags: parse_tags(query.tags.as_deref()),
        skip: query.skip,
        limit: query.limit,
    };
    match state.store.list(&filter) {
        Ok(records) => ApiResponse::ok(records).into_response(),
        Err(e) => store_error(e),
    }
}

/// POST /api/v1/records
pub async fn create_record(
    State(state): State<ApiState>,
    Json(new): Json<NewRecord>,
) -> impl IntoResponse {
    match state.store.create(new) {
        Ok(record) => (StatusCode::CREATED, ApiResponse::ok(record)).into_response(),
        Err(e) => store_error(e),
    }
}

/// GET /api/v1/records/{id}
pub async fn get_record(
    State(state): State<ApiState>,
    Path(id): Path<RecordId>,
) -> impl IntoResponse {
    match state.store.get(id) {
        Ok(Some(record)) => ApiResponse::ok(record).into_response(),
        Ok(None) => error_response("record not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => store_error(e),
    }
}

/// PUT /api/v1/records/{id}
pub async fn update_record(
    State(state): State<ApiState>,
    Path(id): Path<RecordId>,
    Json(patch): Json<RecordPatch>,
) -> impl IntoResponse {
    match state.store.update(id, &patch) {
        Ok(record) => ApiResponse::ok(record).into_response(),
        Err(e) => store_error(e),
    }
}

/// DELETE /api/v1/records/{id}
pub async fn delete_record(
    State(state): State<ApiState>,
    Path(id): Path<RecordId>,
) -> impl IntoResponse {
    match state.store.delete(id) {
        Ok(true) => ApiResponse::ok("deleted").into_response(),
        Ok(false) => error_response("record not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => store_error(e),
    }
}

/// DELETE /api/v1/records
pub async fn delete_all_records(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.delete_all() {
        Ok(count) => ApiResponse::ok(serde_json::json!({ "deleted": count })).into_response(),
        Err(e) => store_error(e),
    }
}

// ── Checkout / release ─────────────────────────────────────────

/// Query parameters for `POST /records/checkout`.
#[derive(serde::Deserialize)]
pub struct CheckoutQuery {
    pub region: Option<String>,
    pub uc_status: Option<UcStatus>,
    pub financial_status: Option<String>,
    pub tags: Option<String>,
    pub consumer_id: Option<String>,
}

/// POST /api/v1/records/checkout
///
/// Reserves one AVAILABLE record matching the criteria. 404 is the expected
/// answer for an exhausted pool, not a fault.
pub async fn checkout_record(
    State(state): State<ApiState>,
    Query(query): Query<CheckoutQuery>,
) -> impl IntoResponse {
    let filter = CheckoutFilter {
        region: query.region,
        uc_status: query.uc_status,
        financial_status: query.financial_status,
        tags: parse_tags(query.tags.as_deref()),
    };
    let consumer_id = query.consumer_id.as_deref().unwrap_or("automated_test");
    match state.store.checkout(&filter, consumer_id) {
        Ok(record) => ApiResponse::ok(record).into_response(),
        Err(e) => store_error(e),
    }
}

/// Query parameters for `POST /records/{id}/release`.
#[derive(serde::Deserialize)]
pub struct ReleaseQuery {
    pub new_status: Option<RecordStatus>,
}

/// POST /api/v1/records/{id}/release
pub async fn release_record(
    State(state): State<ApiState>,
    Path(id): Path<RecordId>,
    Query(query): Query<ReleaseQuery>,
) -> impl IntoResponse {
    let new_status = query.new_status.unwrap_or(RecordStatus::Available);
    match state.store.release(id, new_status) {
        Ok(record) => ApiResponse::ok(record).into_response(),
        Err(e) => store_error(e),
    }
}

// ── Import ─────────────────────────────────────────────────────

/// POST /api/v1/records/import
pub async fn import_records(
    State(state): State<ApiState>,
    Json(batch): Json<Vec<NewRecord>>,
) -> impl IntoResponse {
    match state.store.import(batch) {
        Ok(report) => ApiResponse::ok(report).into_response(),
        Err(e) => store_error(e),
    }
}

// ── Settings ───────────────────────────────────────────────────

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.settings.get())
}

/// POST /api/v1/settings
pub async fn update_settings(
    State(state): State<ApiState>,
    Json(settings): Json<Settings>,
) -> impl IntoResponse {
    state.settings.update(settings);
    ApiResponse::ok(state.settings.get())
}
