use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::{Grupo, Status, Ticket, Tipo};
use crate::zone::Zone;
use crate::CoreError;

/// Board filter. Every field is optional; an empty field matches everything.
///
/// Date bounds are calendar days in a [`Zone`]. The lower bound admits
/// anything after one second before the start of `data_inicio`; the upper
/// bound admits anything before one second past the end of `data_fim`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketFilter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub titulo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grupo: Option<Grupo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<Tipo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_inicio: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_fim: Option<NaiveDate>,
}

impl TicketFilter {
    pub fn is_empty(&self) -> bool {
        self == &TicketFilter::default()
    }

    pub fn clear(&mut self) {
        *self = TicketFilter::default();
    }

    /// [`TicketFilter::matches_in`] with days taken in the local zone.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.matches_in(ticket, Zone::Local)
    }

    pub fn matches_in(&self, ticket: &Ticket, zone: Zone) -> bool {
        self.titulo_matches(ticket)
            && self.grupo.map_or(true, |g| ticket.grupo == Some(g))
            && self.tipo.map_or(true, |t| ticket.tipo == Some(t))
            && self.status.map_or(true, |s| ticket.status == s)
            && self
                .data_inicio
                .map_or(true, |d| ticket.criadoem > lower_bound(d, zone))
            && self
                .data_fim
                .map_or(true, |d| ticket.criadoem < upper_bound(d, zone))
    }

    pub fn apply<'a, I>(&'a self, tickets: I) -> impl Iterator<Item = &'a Ticket> + 'a
    where
        I: IntoIterator<Item = &'a Ticket>,
        I::IntoIter: 'a,
    {
        self.apply_in(tickets, Zone::Local)
    }

    pub fn apply_in<'a, I>(
        &'a self,
        tickets: I,
        zone: Zone,
    ) -> impl Iterator<Item = &'a Ticket> + 'a
    where
        I: IntoIterator<Item = &'a Ticket>,
        I::IntoIter: 'a,
    {
        tickets.into_iter().filter(move |t| self.matches_in(t, zone))
    }

    fn titulo_matches(&self, ticket: &Ticket) -> bool {
        if self.titulo.is_empty() {
            return true;
        }
        ticket
            .titulo
            .to_lowercase()
            .contains(&self.titulo.to_lowercase())
    }
}

fn lower_bound(date: NaiveDate, zone: Zone) -> DateTime<Utc> {
    zone.start_of_day(date) - Duration::seconds(1)
}

fn upper_bound(date: NaiveDate, zone: Zone) -> DateTime<Utc> {
    let Some(next) = date.succ_opt() else {
        return DateTime::<Utc>::MAX_UTC;
    };
    let end_of_day = zone.start_of_day(next) - Duration::milliseconds(1);
    end_of_day + Duration::seconds(1)
}

/// Parse a `YYYY-MM-DD` date as typed into a filter field.
pub fn parse_date(input: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CoreError::InvalidInput(format!("date {input:?}: {e}")))
}
