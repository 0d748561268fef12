pub mod images;
pub mod tickets;
