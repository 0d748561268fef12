use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bilhetes_service::TicketService;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{to_error, ApiError, AppState};

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/images", get(list_images))
        .route(
            "/api/tickets/{id}/images",
            get(list_ticket_images)
                .post(upload_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: String,
}

async fn list_images(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .service
        .list_images()
        .await
        .map(|m| Json(json!(m)))
        .map_err(to_error)
}

async fn list_ticket_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .list_ticket_images(&id)
        .await
        .map(|i| Json(json!(i)))
        .map_err(to_error)
}

async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .service
        .upload_image(&id, &params.filename, body.to_vec())
        .await
        .map(|i| (StatusCode::CREATED, Json(json!(i))))
        .map_err(to_error)
}
