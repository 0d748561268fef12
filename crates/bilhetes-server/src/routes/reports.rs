use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bilhetes_report::ExportFormat;
use bilhetes_service::{ServiceError, TicketService};
use serde_json::{json, Value};

use super::tickets::parse_query;
use super::{to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/report", get(report))
        .route("/api/export/{format}", get(export))
}

async fn report(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let query = parse_query(&params)?;
    state
        .service
        .report(query.year, query.zone)
        .await
        .map(|r| Json(json!(r)))
        .map_err(to_error)
}

/// `/api/export/csv` or `/api/export/xlsx`, served as an attachment.
async fn export(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let format = ExportFormat::parse_str(&format).ok_or_else(|| {
        to_error(ServiceError::InvalidInput(format!(
            "unknown export format {format:?}"
        )))
    })?;
    let query = parse_query(&params)?;
    let data = state
        .service
        .export(format, &query)
        .await
        .map_err(to_error)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        format.file_name(query.year)
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}
