mod routes;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use bilhetes_db::{Database, DbConfig, SqliteDatabase};
use bilhetes_service::LocalService;
use bilhetes_store::{ObjectStore, StoreConfig};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use routes::{AppState, InnerAppState};

pub fn build_state(db: Arc<dyn Database>, store: Arc<dyn ObjectStore>) -> AppState {
    Arc::new(InnerAppState {
        service: LocalService::new(db, store.clone()),
        store,
    })
}

/// Open the SQLite database and the configured object store.
pub fn open_state(db_config: &DbConfig, store_config: &StoreConfig) -> Result<AppState> {
    let db = SqliteDatabase::open(db_config)
        .with_context(|| format!("open database {}", db_config.resolved_path().display()))?;
    let store = bilhetes_store::create_store(store_config).context("open object store")?;
    Ok(build_state(Arc::new(db), store))
}

/// Address clients should use to reach a listener bound to `addr`.
pub fn public_url_for(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("http://127.0.0.1:{}", addr.port())
    } else {
        format!("http://{addr}")
    }
}

/// Full application: API and file routes, CORS, request tracing.
pub fn build_app(state: AppState) -> Router {
    routes::build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = build_app(state);
    axum::serve(listener, app).await?;
    Ok(())
}
