use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use bilhetes_service::ServiceError;
use bilhetes_store::content_type_for_key;

use super::{to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/files/{*key}", get(get_file))
}

async fn get_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state
        .store
        .get(&key)
        .await
        .map_err(|e| to_error(ServiceError::from(e)))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for_key(&key))],
        data,
    ))
}
