use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bilhetes_core::ticket::{CreateTicket, UpdateTicket};
use bilhetes_service::{ServiceError, TicketQuery, TicketService};
use serde_json::{json, Value};

use super::{to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/{id}", get(get_ticket).put(update_ticket))
}

/// Parse `year` plus the board filter out of raw query pairs.
pub(crate) fn parse_query(params: &HashMap<String, String>) -> Result<TicketQuery, ApiError> {
    TicketQuery::from_params(params).map_err(|e| to_error(ServiceError::from(e)))
}

async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let query = parse_query(&params)?;
    state
        .service
        .list_tickets(&query)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .get_ticket(&id)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn create_ticket(
    State(state): State<AppState>,
    Json(input): Json<CreateTicket>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state
        .service
        .create_ticket(&input)
        .await
        .map(|t| (StatusCode::CREATED, Json(json!(t))))
        .map_err(to_error)
}

async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTicket>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .update_ticket(&id, &input)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}
