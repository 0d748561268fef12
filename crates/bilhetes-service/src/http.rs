use std::collections::HashMap;

use async_trait::async_trait;
use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Ticket, UpdateTicket};
use bilhetes_core::Zone;
use bilhetes_report::{ExportFormat, Report};
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::{ServiceError, TicketQuery, TicketService};

/// Async HTTP client implementation of `TicketService`.
/// Connects to a running bilhetes-server.
pub struct HttpService {
    base_url: String,
    client: Client,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::Internal(format!(
                "health check failed: {}",
                resp.status()
            )))
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        builder
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query);
        handle_response(self.send(builder).await?).await
    }

    async fn get_bytes(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>, ServiceError> {
        let builder = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query);
        let resp = self.send(builder).await?;
        let status = resp.status();
        if status.is_success() {
            resp.bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| ServiceError::Internal(format!("read body: {e}")))
        } else {
            Err(parse_error_with_status(status, resp).await)
        }
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        handle_response(self.send(builder).await?).await
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .put(format!("{}{path}", self.base_url))
            .json(body);
        handle_response(self.send(builder).await?).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

/// Map `{"error": msg}` bodies back onto the service error variants.
async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or(body);
    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(msg),
        StatusCode::BAD_REQUEST => ServiceError::InvalidInput(msg),
        _ => ServiceError::Internal(msg),
    }
}

#[async_trait]
impl TicketService for HttpService {
    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, ServiceError> {
        self.get_json("/api/tickets", &query.to_params()).await
    }

    async fn get_ticket(&self, id: &str) -> Result<Ticket, ServiceError> {
        self.get_json(&format!("/api/tickets/{id}"), &[]).await
    }

    async fn create_ticket(&self, input: &CreateTicket) -> Result<Ticket, ServiceError> {
        self.post_json("/api/tickets", input).await
    }

    async fn update_ticket(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, ServiceError> {
        self.put_json(&format!("/api/tickets/{id}"), update).await
    }

    async fn list_images(&self) -> Result<HashMap<String, Vec<TicketImage>>, ServiceError> {
        self.get_json("/api/images", &[]).await
    }

    async fn list_ticket_images(&self, ticket_id: &str) -> Result<Vec<TicketImage>, ServiceError> {
        self.get_json(&format!("/api/tickets/{ticket_id}/images"), &[])
            .await
    }

    async fn upload_image(
        &self,
        ticket_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<TicketImage, ServiceError> {
        let builder = self
            .client
            .post(format!("{}/api/tickets/{ticket_id}/images", self.base_url))
            .query(&[("filename", filename)])
            .header("Content-Type", "application/octet-stream")
            .body(data);
        handle_response(self.send(builder).await?).await
    }

    async fn report(&self, year: Option<i32>, zone: Zone) -> Result<Report, ServiceError> {
        let query = TicketQuery::year(year).in_zone(zone);
        self.get_json("/api/report", &query.to_params()).await
    }

    async fn export(
        &self,
        format: ExportFormat,
        query: &TicketQuery,
    ) -> Result<Vec<u8>, ServiceError> {
        self.get_bytes(
            &format!("/api/export/{}", format.extension()),
            &query.to_params(),
        )
        .await
    }
}
