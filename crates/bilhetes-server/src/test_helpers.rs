use std::sync::Arc;

use bilhetes_db::SqliteDatabase;
use bilhetes_store::StoreConfig;
use tokio::net::TcpListener;

use crate::AppState;

/// In-memory SQLite plus a local store in a fresh temp directory.
pub fn test_state(public_base_url: Option<String>) -> AppState {
    let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
    let store_config = StoreConfig {
        local_data_dir: Some(
            tempfile::tempdir()
                .unwrap()
                .keep()
                .to_string_lossy()
                .to_string(),
        ),
        public_base_url,
        ..Default::default()
    };
    let store = bilhetes_store::create_store(&store_config).unwrap();
    crate::build_state(db, store)
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn a server on a random port. Image URLs point back at it.
pub async fn spawn_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let state = test_state(Some(base_url.clone()));
    let handle = tokio::spawn(async move {
        crate::serve(listener, state).await.unwrap();
    });
    TestServer {
        base_url,
        _handle: handle,
    }
}
