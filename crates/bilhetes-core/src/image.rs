use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketImage {
    pub id: String,
    pub ticket_id: String,
    pub filename: String,
    pub store_key: String,
    pub size_bytes: i64,
    /// Public URL, resolved by the gateway when the image is read.
    #[serde(default)]
    pub url: String,
    pub created_at: DateTime<Utc>,
}
