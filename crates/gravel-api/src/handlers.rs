//! REST API handlers.
//!
//! Namespace handlers return the JSON envelope; key handlers move values as
//! raw bytes in both directions.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::error;

use gravel_namespace::{NamespaceError, NamespaceInfo, NamespaceState};

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

/// Outward status category for a domain error.
pub fn status_for(err: &NamespaceError) -> StatusCode {
    match err {
        NamespaceError::AlreadyExists => StatusCode::CONFLICT,
        NamespaceError::Deleting | NamespaceError::InvalidName { .. } => StatusCode::BAD_REQUEST,
        NamespaceError::NotFound | NamespaceError::KeyNotFound => StatusCode::NOT_FOUND,
        NamespaceError::Corrupt { .. } | NamespaceError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn namespace_error(err: NamespaceError) -> axum::response::Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    error_response(&err.to_string(), status).into_response()
}

// ── Namespaces ─────────────────────────────────────────────────

/// GET /api/namespaces
pub async fn list_namespaces(State(state): State<ApiState>) -> impl IntoResponse {
    match state.service.list_namespaces() {
        Ok(namespaces) => ApiResponse::ok(namespaces).into_response(),
        Err(e) => namespace_error(e),
    }
}

/// GET /api/namespaces/{namespace}
pub async fn get_namespace(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.service.namespace_state(&namespace) {
        Ok(Some(ns_state)) => ApiResponse::ok(NamespaceInfo {
            name: namespace,
            state: ns_state,
        })
        .into_response(),
        Ok(None) => namespace_error(NamespaceError::NotFound),
        Err(e) => namespace_error(e),
    }
}

/// POST /api/namespaces/{namespace}
pub async fn create_namespace(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.service.create_namespace(&namespace) {
        Ok(()) => (
            StatusCode::CREATED,
            ApiResponse::ok(NamespaceInfo {
                name: namespace,
                state: NamespaceState::Exists,
            }),
        )
            .into_response(),
        Err(e) => namespace_error(e),
    }
}

/// DELETE /api/namespaces/{namespace}
pub async fn delete_namespace(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.service.delete_namespace(&namespace) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            ApiResponse::ok(NamespaceInfo {
                name: namespace,
                state: NamespaceState::Deleting,
            }),
        )
            .into_response(),
        Err(e) => namespace_error(e),
    }
}

// ── Keys ───────────────────────────────────────────────────────

/// GET /api/namespaces/{namespace}/keys/{key}
pub async fn get_key(
    State(state): State<ApiState>,
    Path((namespace, key)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.service.get_key(&namespace, &key) {
        Ok(value) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            value,
        )
            .into_response(),
        Err(e) => namespace_error(e),
    }
}

/// PUT /api/namespaces/{namespace}/keys/{key}
pub async fn set_key(
    State(state): State<ApiState>,
    Path((namespace, key)): Path<(String, String)>,
    body: Bytes,
) -> impl IntoResponse {
    match state.service.set_key(&namespace, &key, &body) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => namespace_error(e),
    }
}

/// DELETE /api/namespaces/{namespace}/keys/{key}
pub async fn delete_key(
    State(state): State<ApiState>,
    Path((namespace, key)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.service.delete_key(&namespace, &key) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => namespace_error(e),
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}
