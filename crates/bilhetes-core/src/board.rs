use serde::{Deserialize, Serialize};

use crate::filter::TicketFilter;
use crate::ticket::{Status, Ticket};
use crate::zone::Zone;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumn {
    pub status: Status,
    pub tickets: Vec<Ticket>,
}

/// Tickets split into one column per status, in `Status::ALL` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub columns: Vec<BoardColumn>,
}

impl Board {
    /// Filter first, then bucket by status. Input order is kept inside each column.
    pub fn build(tickets: &[Ticket], filter: &TicketFilter, zone: Zone) -> Self {
        let mut columns: Vec<BoardColumn> = Status::ALL
            .iter()
            .map(|&status| BoardColumn {
                status,
                tickets: Vec::new(),
            })
            .collect();

        for ticket in filter.apply_in(tickets, zone) {
            if let Some(col) = columns.iter_mut().find(|c| c.status == ticket.status) {
                col.tickets.push(ticket.clone());
            }
        }

        Self { columns }
    }

    pub fn column(&self, status: Status) -> &[Ticket] {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.tickets.as_slice())
            .unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.tickets.len()).sum()
    }
}
