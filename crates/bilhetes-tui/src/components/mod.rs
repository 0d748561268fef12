pub mod ticket_board;
