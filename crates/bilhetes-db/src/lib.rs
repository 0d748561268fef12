//! Ticket persistence. The `Database` trait is the seam the service layer talks
//! to; `SqliteDatabase` is the only backend.

pub mod sqlite;

use std::ops::Range;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Ticket, UpdateTicket};

pub use sqlite::SqliteDatabase;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbConfig {
    /// SQLite file. Defaults to `bilhetes.db` under [`data_dir`].
    pub sqlite_path: Option<String>,
}

impl DbConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            sqlite_path: Some(path.into()),
        }
    }

    pub fn resolved_path(&self) -> PathBuf {
        self.sqlite_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("bilhetes.db"))
    }
}

/// `$XDG_DATA_HOME/bilhetes`, falling back to `~/.local/share/bilhetes`.
pub fn data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("bilhetes")
}

#[async_trait]
pub trait Database: Send + Sync {
    // -- Tickets --
    async fn create_ticket(&self, input: &CreateTicket) -> Result<Ticket, DbError>;
    async fn get_ticket(&self, id: &str) -> Result<Ticket, DbError>;
    /// Newest first. `created` restricts to tickets created inside the half-open range.
    async fn list_tickets(
        &self,
        created: Option<Range<DateTime<Utc>>>,
    ) -> Result<Vec<Ticket>, DbError>;
    async fn update_ticket(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, DbError>;

    // -- Images --
    async fn create_ticket_image(
        &self,
        ticket_id: &str,
        filename: &str,
        store_key: &str,
        size_bytes: i64,
    ) -> Result<TicketImage, DbError>;
    async fn list_ticket_images(&self, ticket_id: &str) -> Result<Vec<TicketImage>, DbError>;
    async fn list_images(&self) -> Result<Vec<TicketImage>, DbError>;
}
