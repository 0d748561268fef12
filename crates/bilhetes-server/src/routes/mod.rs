pub mod files;
pub mod health;
pub mod images;
pub mod reports;
pub mod tickets;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use bilhetes_service::{LocalService, ServiceError};
use bilhetes_store::ObjectStore;
use serde_json::{json, Value};

pub struct InnerAppState {
    pub service: LocalService,
    /// Same store the service writes to; `/files/` reads from it directly.
    pub store: Arc<dyn ObjectStore>,
}

pub type AppState = Arc<InnerAppState>;

pub type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(tickets::routes())
        .merge(images::routes())
        .merge(reports::routes())
        .merge(files::routes())
        .with_state(state)
}

pub(crate) fn to_error(e: ServiceError) -> ApiError {
    let status = match &e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::Internal(_) => {
            tracing::error!(error = %e, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": e.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use bilhetes_db::SqliteDatabase;
    use bilhetes_store::{LocalStore, StoreConfig};
    use tower::ServiceExt;

    fn app(dir: &std::path::Path) -> Router {
        let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(&StoreConfig {
            local_data_dir: Some(dir.to_string_lossy().to_string()),
            ..Default::default()
        }));
        let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        build_router(crate::build_state(db, store))
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn errors_map_to_status_codes() {
        let (status, Json(body)) = to_error(ServiceError::NotFound("ticket x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found: ticket x");
        assert_eq!(
            to_error(ServiceError::InvalidInput("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            to_error(ServiceError::Internal("x".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn health_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn create_then_get_ticket() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        let resp = app
            .clone()
            .oneshot(
                Request::post("/api/tickets")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"titulo":"Printer jam","grupo":"hardware","tipo":"corretiva","responsavel":"Erik"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["status"], "aberto");

        let resp = app
            .oneshot(
                Request::get(format!("/api/tickets/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["titulo"], "Printer jam");
    }

    #[tokio::test]
    async fn blank_title_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path())
            .oneshot(
                Request::post("/api/tickets")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"titulo":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_ticket_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path())
            .oneshot(
                Request::get("/api/tickets/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_filter_value_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path())
            .oneshot(
                Request::get("/api/tickets?grupo=telefonia")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_zone_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path())
            .oneshot(
                Request::get("/api/report?year=2024&tz=Mars")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn files_route_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let resp = app(tmp.path())
            .oneshot(
                Request::get("/files/../secret.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
