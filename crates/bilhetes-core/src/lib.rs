pub mod board;
pub mod error;
pub mod filter;
pub mod image;
pub mod ticket;
pub mod zone;

pub use board::Board;
pub use error::CoreError;
pub use filter::TicketFilter;
pub use image::TicketImage;
pub use ticket::{CreateTicket, Grupo, Responsavel, Status, Ticket, Tipo, UpdateTicket};
pub use zone::Zone;
