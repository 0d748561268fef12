use std::collections::HashMap;

use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Ticket, UpdateTicket};
use bilhetes_core::Zone;
use bilhetes_report::{ExportFormat, Report};
use tokio::runtime::Runtime;

use crate::{HttpService, ServiceError, TicketQuery, TicketService};

/// Blocking wrapper around the async `HttpService`.
///
/// Owns a private tokio runtime and uses `block_on()` for each call, for sync
/// callers like the TUI.
pub struct BlockingHttpService {
    inner: HttpService,
    rt: Runtime,
}

impl BlockingHttpService {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let rt = Runtime::new()
            .map_err(|e| ServiceError::Internal(format!("failed to create tokio runtime: {e}")))?;
        Ok(Self {
            inner: HttpService::new(base_url),
            rt,
        })
    }

    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    pub fn health_check(&self) -> Result<(), ServiceError> {
        self.rt.block_on(self.inner.health_check())
    }

    // -- Trait method delegates --

    pub fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, ServiceError> {
        self.rt.block_on(self.inner.list_tickets(query))
    }

    pub fn get_ticket(&self, id: &str) -> Result<Ticket, ServiceError> {
        self.rt.block_on(self.inner.get_ticket(id))
    }

    pub fn create_ticket(&self, input: &CreateTicket) -> Result<Ticket, ServiceError> {
        self.rt.block_on(self.inner.create_ticket(input))
    }

    pub fn update_ticket(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, ServiceError> {
        self.rt.block_on(self.inner.update_ticket(id, update))
    }

    pub fn list_images(&self) -> Result<HashMap<String, Vec<TicketImage>>, ServiceError> {
        self.rt.block_on(self.inner.list_images())
    }

    pub fn list_ticket_images(&self, ticket_id: &str) -> Result<Vec<TicketImage>, ServiceError> {
        self.rt.block_on(self.inner.list_ticket_images(ticket_id))
    }

    pub fn upload_image(
        &self,
        ticket_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<TicketImage, ServiceError> {
        self.rt
            .block_on(self.inner.upload_image(ticket_id, filename, data))
    }

    pub fn report(&self, year: Option<i32>, zone: Zone) -> Result<Report, ServiceError> {
        self.rt.block_on(self.inner.report(year, zone))
    }

    pub fn export(
        &self,
        format: ExportFormat,
        query: &TicketQuery,
    ) -> Result<Vec<u8>, ServiceError> {
        self.rt.block_on(self.inner.export(format, query))
    }
}
