use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use bilhetes_core::image::TicketImage;

use super::super::{SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_image(row: &Row) -> rusqlite::Result<TicketImage> {
    Ok(TicketImage {
        id: row.get("id")?,
        ticket_id: row.get("ticket_id")?,
        filename: row.get("filename")?,
        store_key: row.get("store_key")?,
        size_bytes: row.get("size_bytes")?,
        url: String::new(),
        created_at: row.get("created_at")?,
    })
}

impl SqliteDatabase {
    pub fn create_ticket_image_sync(
        &self,
        ticket_id: &str,
        filename: &str,
        store_key: &str,
        size_bytes: i64,
    ) -> Result<TicketImage, DbError> {
        self.with_conn(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM tickets WHERE id = ?1",
                    params![ticket_id],
                    |_| Ok(()),
                )
                .optional()
                .to_db()?;
            if exists.is_none() {
                return Err(DbError::NotFound(format!("ticket {ticket_id}")));
            }

            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO ticket_images (id, ticket_id, filename, store_key, size_bytes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, ticket_id, filename, store_key, size_bytes, Utc::now()],
            )
            .to_db()?;
            conn.query_row(
                "SELECT * FROM ticket_images WHERE id = ?1",
                params![id],
                row_to_image,
            )
            .to_db()
        })
    }

    /// Oldest first, so upload order is kept.
    pub fn list_ticket_images_sync(&self, ticket_id: &str) -> Result<Vec<TicketImage>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM ticket_images WHERE ticket_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .to_db()?;
            let images = stmt
                .query_map(params![ticket_id], row_to_image)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(images)
        })
    }

    pub fn list_images_sync(&self) -> Result<Vec<TicketImage>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM ticket_images ORDER BY created_at ASC, rowid ASC")
                .to_db()?;
            let images = stmt
                .query_map([], row_to_image)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(images)
        })
    }
}
