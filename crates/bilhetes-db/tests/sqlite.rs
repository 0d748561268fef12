// Runs the shared Database assertions against the in-memory SQLite backend.

mod common;

use std::sync::Arc;

use bilhetes_db::Database;

async fn make_db() -> Arc<dyn Database> {
    Arc::new(bilhetes_db::SqliteDatabase::open_in_memory().unwrap())
}

#[tokio::test]
async fn ticket_crud() {
    let db = make_db().await;
    common::test_ticket_crud(&*db).await;
}

#[tokio::test]
async fn missing_ticket() {
    let db = make_db().await;
    common::test_missing_ticket(&*db).await;
}

#[tokio::test]
async fn list_order_and_year() {
    let db = make_db().await;
    common::test_list_order_and_year(&*db).await;
}

#[tokio::test]
async fn images() {
    let db = make_db().await;
    common::test_images(&*db).await;
}

#[tokio::test]
async fn image_for_missing_ticket() {
    let db = make_db().await;
    common::test_image_for_missing_ticket(&*db).await;
}
