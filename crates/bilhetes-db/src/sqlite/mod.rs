pub(crate) mod migrations;
pub mod queries;

use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Ticket, UpdateTicket};

use crate::{Database, DbConfig, DbError};

/// `.to_db()?` maps a rusqlite error onto `DbError::Internal`.
pub(crate) trait SqliteResultExt<T> {
    fn to_db(self) -> Result<T, DbError>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn to_db(self) -> Result<T, DbError> {
        self.map_err(map_sqlite_err)
    }
}

pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> DbError {
    DbError::Internal(e.to_string())
}

/// Like `to_db`, but a missing row becomes `NotFound(what)`.
pub(crate) fn not_found_or_internal(what: String) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what),
        other => DbError::Internal(other.to_string()),
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open(config: &DbConfig) -> Result<Self, DbError> {
        let path = config.resolved_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_path(&path)
    }

    pub fn open_path(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).to_db()?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )
        .to_db()?;
        tracing::debug!(path = %path.display(), "opened sqlite database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().to_db()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;").to_db()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.with_conn(migrations::run)?;
        Ok(db)
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbError::Internal("lock poisoned".into()))?;
        f(&conn)
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&SqliteDatabase) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| DbError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn create_ticket(&self, input: &CreateTicket) -> Result<Ticket, DbError> {
        let input = input.clone();
        self.blocking(move |db| db.create_ticket_sync(&input)).await
    }

    async fn get_ticket(&self, id: &str) -> Result<Ticket, DbError> {
        let id = id.to_string();
        self.blocking(move |db| db.get_ticket_sync(&id)).await
    }

    async fn list_tickets(
        &self,
        created: Option<Range<DateTime<Utc>>>,
    ) -> Result<Vec<Ticket>, DbError> {
        self.blocking(move |db| db.list_tickets_sync(created.as_ref()))
            .await
    }

    async fn update_ticket(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, DbError> {
        let id = id.to_string();
        let update = update.clone();
        self.blocking(move |db| db.update_ticket_sync(&id, &update))
            .await
    }

    async fn create_ticket_image(
        &self,
        ticket_id: &str,
        filename: &str,
        store_key: &str,
        size_bytes: i64,
    ) -> Result<TicketImage, DbError> {
        let ticket_id = ticket_id.to_string();
        let filename = filename.to_string();
        let store_key = store_key.to_string();
        self.blocking(move |db| {
            db.create_ticket_image_sync(&ticket_id, &filename, &store_key, size_bytes)
        })
        .await
    }

    async fn list_ticket_images(&self, ticket_id: &str) -> Result<Vec<TicketImage>, DbError> {
        let ticket_id = ticket_id.to_string();
        self.blocking(move |db| db.list_ticket_images_sync(&ticket_id))
            .await
    }

    async fn list_images(&self) -> Result<Vec<TicketImage>, DbError> {
        self.blocking(|db| db.list_images_sync()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_runs_migrations() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('tickets', 'ticket_images')",
                    [],
                    |row| row.get(0),
                )
                .to_db()?;
            assert_eq!(count, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn open_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested/dir/test.db");
        let config = DbConfig::sqlite(db_path.to_string_lossy());

        let _db = SqliteDatabase::open(&config).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn reopening_keeps_schema_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("bilhetes.db");
        {
            let db = SqliteDatabase::open_path(&db_path).unwrap();
            db.create_ticket_sync(&CreateTicket {
                titulo: "Persisted".into(),
                ..Default::default()
            })
            .unwrap();
        }
        let db = SqliteDatabase::open_path(&db_path).unwrap();
        assert_eq!(db.list_tickets_sync(None).unwrap().len(), 1);
    }
}
