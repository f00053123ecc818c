use std::any::Any;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Form, Query, State},
    extract::rejection::{FormRejection, QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use moment_types::api::{Envelope, MomentList, ReadParams, WriteParams, WritePayload};

use crate::service::MomentService;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MomentService>,
}

/// POST / — write verb. Parameters arrive form-encoded, never as JSON;
/// `action` picks the handler. Every outcome is a 200 with the envelope.
pub async fn write_entry(
    State(state): State<AppState>,
    form: Result<Form<WriteParams>, FormRejection>,
) -> Json<Envelope<WritePayload>> {
    let params = match form {
        Ok(Form(params)) => params,
        Err(rejection) => return Json(Envelope::fail(format!("Server error: {rejection}"))),
    };

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.handle_write(&params)).await;

    Json(result.unwrap_or_else(|e| {
        error!("spawn_blocking join error: {}", e);
        Envelope::fail(format!("Server error: {e}"))
    }))
}

/// GET / — read verb.
pub async fn read_entry(
    State(state): State<AppState>,
    query: Result<Query<ReadParams>, QueryRejection>,
) -> Json<Envelope<MomentList>> {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return Json(Envelope::fail(format!("Server error: {rejection}"))),
    };

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.handle_read(&params)).await;

    Json(result.unwrap_or_else(|e| {
        error!("spawn_blocking join error: {}", e);
        Envelope::fail(format!("Server error: {e}"))
    }))
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailQuery {
    pub id: String,
}

/// GET /thumbnail?id=… — serves a shared image's bytes directly, so the
/// URLs handed out by uploadImage stay embeddable from any origin. The
/// `sz` width hint in those URLs is accepted and ignored.
pub async fn thumbnail(
    State(state): State<AppState>,
    Query(query): Query<ThumbnailQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Ids are UUIDs; rejecting anything else also blocks path traversal
    query.id.parse::<Uuid>().map_err(|_| StatusCode::BAD_REQUEST)?;

    let service = state.service.clone();
    let id = query.id.clone();
    let blob = tokio::task::spawn_blocking(move || service.shared_blob(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Blob fetch failed for {}: {}", query.id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let blob = blob.ok_or(StatusCode::NOT_FOUND)?;

    Ok(([(header::CONTENT_TYPE, blob.mime)], blob.bytes))
}

/// GET /health — liveness check.
pub async fn health() -> &'static str {
    "ok"
}

/// Outermost safety net: a panic anywhere below still produces the standard
/// failure envelope instead of an empty 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!("Handler panicked: {}", detail);

    let body = Envelope::<()>::fail(format!("Server error: {detail}"));
    (StatusCode::OK, Json(body)).into_response()
}
