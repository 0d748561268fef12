use std::collections::HashMap;

use async_trait::async_trait;
use bilhetes_core::filter::{parse_date, TicketFilter};
use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Grupo, Status, Ticket, Tipo, UpdateTicket};
use bilhetes_core::{CoreError, Zone};
use bilhetes_report::{ExportFormat, Report, ReportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        ServiceError::InvalidInput(e.to_string())
    }
}

impl From<ReportError> for ServiceError {
    fn from(e: ReportError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

/// What `list_tickets` and the exports select: an optional creation year plus
/// the board filter. Years and filter days are taken in `zone`; over HTTP a
/// `Zone::Local` query falls back to the server's local zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketQuery {
    pub year: Option<i32>,
    pub filter: TicketFilter,
    pub zone: Zone,
}

impl TicketQuery {
    pub fn year(year: Option<i32>) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    pub fn in_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Query-string pairs, omitting empty fields.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let f = &self.filter;
        let mut params = Vec::new();
        if let Some(year) = self.year {
            params.push(("year", year.to_string()));
        }
        if !f.titulo.is_empty() {
            params.push(("titulo", f.titulo.clone()));
        }
        if let Some(g) = f.grupo {
            params.push(("grupo", g.as_str().to_string()));
        }
        if let Some(t) = f.tipo {
            params.push(("tipo", t.as_str().to_string()));
        }
        if let Some(s) = f.status {
            params.push(("status", s.as_str().to_string()));
        }
        if let Some(d) = f.data_inicio {
            params.push(("data_inicio", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = f.data_fim {
            params.push(("data_fim", d.format("%Y-%m-%d").to_string()));
        }
        if self.zone != Zone::Local {
            params.push(("tz", self.zone.to_string()));
        }
        params
    }

    /// Inverse of [`TicketQuery::to_params`]. Blank values count as absent;
    /// unknown names are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, CoreError> {
        let get = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let unknown = |kind: &'static str, value: &str| CoreError::UnknownValue {
            kind,
            value: value.to_string(),
        };

        let year = get("year")
            .map(|v| v.parse::<i32>().map_err(|_| unknown("year", v)))
            .transpose()?;
        let filter = TicketFilter {
            titulo: get("titulo").unwrap_or_default().to_string(),
            grupo: get("grupo")
                .map(|v| Grupo::parse_str(v).ok_or_else(|| unknown("grupo", v)))
                .transpose()?,
            tipo: get("tipo")
                .map(|v| Tipo::parse_str(v).ok_or_else(|| unknown("tipo", v)))
                .transpose()?,
            status: get("status")
                .map(|v| Status::parse_str(v).ok_or_else(|| unknown("status", v)))
                .transpose()?,
            data_inicio: get("data_inicio").map(parse_date).transpose()?,
            data_fim: get("data_fim").map(parse_date).transpose()?,
        };
        let zone = get("tz").map(Zone::parse_str).transpose()?.unwrap_or_default();
        Ok(Self { year, filter, zone })
    }
}

/// Abstraction over the ticket gateway.
///
/// The TUI and the server program against this trait.
/// `LocalService` talks to the database and object store directly.
/// `HttpService` talks to a running `bilhetes-server`.
#[async_trait]
pub trait TicketService: Send + Sync {
    // -- Tickets --
    /// Newest first.
    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, ServiceError>;
    async fn get_ticket(&self, id: &str) -> Result<Ticket, ServiceError>;
    async fn create_ticket(&self, input: &CreateTicket) -> Result<Ticket, ServiceError>;
    async fn update_ticket(&self, id: &str, update: &UpdateTicket) -> Result<Ticket, ServiceError>;

    // -- Images --
    /// Every image, grouped by ticket id. Tickets without images are absent.
    async fn list_images(&self) -> Result<HashMap<String, Vec<TicketImage>>, ServiceError>;
    async fn list_ticket_images(&self, ticket_id: &str) -> Result<Vec<TicketImage>, ServiceError>;
    async fn upload_image(
        &self,
        ticket_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<TicketImage, ServiceError>;

    // -- Reporting --
    /// `anos` covers every ticket; counts cover `year` as seen from `zone`.
    async fn report(&self, year: Option<i32>, zone: Zone) -> Result<Report, ServiceError>;
    async fn export(&self, format: ExportFormat, query: &TicketQuery)
        -> Result<Vec<u8>, ServiceError>;
}

/// Group a flat image list by ticket id, keeping list order within a ticket.
pub fn group_images(images: Vec<TicketImage>) -> HashMap<String, Vec<TicketImage>> {
    let mut grouped: HashMap<String, Vec<TicketImage>> = HashMap::new();
    for image in images {
        grouped.entry(image.ticket_id.clone()).or_default().push(image);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn params_roundtrip_through_query() {
        let query = TicketQuery {
            year: Some(2024),
            filter: TicketFilter {
                titulo: "printer".into(),
                grupo: Some(Grupo::AjudaDuvida),
                tipo: Some(Tipo::Configuracao),
                status: Some(Status::EmAndamento),
                data_inicio: NaiveDate::from_ymd_opt(2024, 1, 1),
                data_fim: NaiveDate::from_ymd_opt(2024, 1, 31),
            },
            zone: Zone::parse_str("-03:00").unwrap(),
        };
        let pairs: HashMap<String, String> = query
            .to_params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(TicketQuery::from_params(&pairs).unwrap(), query);
    }

    #[test]
    fn blank_params_are_absent() {
        let query = TicketQuery::from_params(&params(&[("year", ""), ("grupo", " ")])).unwrap();
        assert_eq!(query, TicketQuery::default());
        assert!(TicketQuery::default().to_params().is_empty());
    }

    #[test]
    fn bad_params_are_rejected() {
        assert!(TicketQuery::from_params(&params(&[("year", "dois mil")])).is_err());
        assert!(TicketQuery::from_params(&params(&[("grupo", "telefonia")])).is_err());
        assert!(TicketQuery::from_params(&params(&[("data_fim", "31/01/2024")])).is_err());
        assert!(TicketQuery::from_params(&params(&[("tz", "America/Sao_Paulo")])).is_err());
    }

    #[test]
    fn local_zone_is_not_sent() {
        let query = TicketQuery::year(Some(2024));
        assert!(query.to_params().iter().all(|(k, _)| *k != "tz"));

        let utc = query.in_zone(Zone::utc()).to_params();
        assert!(utc.contains(&("tz", "+00:00".to_string())));
    }

    #[test]
    fn images_group_by_ticket() {
        let image = |id: &str, ticket: &str| TicketImage {
            id: id.into(),
            ticket_id: ticket.into(),
            filename: format!("{id}.png"),
            store_key: format!("tickets/{ticket}/1-{id}.png"),
            size_bytes: 1,
            url: String::new(),
            created_at: chrono::Utc::now(),
        };
        let grouped = group_images(vec![image("a", "t1"), image("b", "t2"), image("c", "t1")]);
        assert_eq!(grouped.len(), 2);
        let t1: Vec<&str> = grouped["t1"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(t1, vec!["a", "c"]);
    }
}
