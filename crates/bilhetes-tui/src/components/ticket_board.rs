use std::collections::HashMap;

use bilhetes_core::board::Board;
use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{Grupo, Status, Ticket};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

/// Kanban view over a [`Board`]: one list per status column with a cursor.
pub struct TicketBoard {
    columns: Vec<BoardColumn>,
    active_column: usize,
}

struct BoardColumn {
    status: Status,
    tickets: Vec<Ticket>,
    list_state: ListState,
}

/// Per-ticket decorations drawn next to the title.
pub struct BoardMarks<'a> {
    pub drafts: &'a HashMap<String, String>,
    pub images: &'a HashMap<String, Vec<TicketImage>>,
}

impl TicketBoard {
    pub fn new(board: Board) -> Self {
        let columns = board
            .columns
            .into_iter()
            .map(|col| {
                let mut list_state = ListState::default();
                if !col.tickets.is_empty() {
                    list_state.select(Some(0));
                }
                BoardColumn {
                    status: col.status,
                    tickets: col.tickets,
                    list_state,
                }
            })
            .collect();
        Self {
            columns,
            active_column: 0,
        }
    }

    pub fn selected_ticket(&self) -> Option<&Ticket> {
        let col = self.columns.get(self.active_column)?;
        let idx = col.list_state.selected()?;
        col.tickets.get(idx)
    }

    /// Move the cursor onto `ticket_id` wherever it now lives.
    /// Leaves the cursor alone and returns `false` if it is gone.
    pub fn select_ticket_by_id(&mut self, ticket_id: &str) -> bool {
        for (col_idx, col) in self.columns.iter_mut().enumerate() {
            if let Some(idx) = col.tickets.iter().position(|t| t.id == ticket_id) {
                self.active_column = col_idx;
                col.list_state.select(Some(idx));
                return true;
            }
        }
        false
    }

    pub fn active_status(&self) -> Status {
        self.columns
            .get(self.active_column)
            .map(|c| c.status)
            .unwrap_or_default()
    }

    pub fn column_len(&self, status: Status) -> usize {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map_or(0, |c| c.tickets.len())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => {
                self.active_column = self.active_column.saturating_sub(1);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if self.active_column + 1 < self.columns.len() {
                    self.active_column += 1;
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if let Some(col) = self.columns.get_mut(self.active_column) {
                    let current = col.list_state.selected().unwrap_or(0);
                    if current + 1 < col.tickets.len() {
                        col.list_state.select(Some(current + 1));
                    }
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if let Some(col) = self.columns.get_mut(self.active_column) {
                    let current = col.list_state.selected().unwrap_or(0);
                    if current > 0 {
                        col.list_state.select(Some(current - 1));
                    }
                }
            }
            KeyCode::Char('g') => {
                if let Some(col) = self.columns.get_mut(self.active_column) {
                    if !col.tickets.is_empty() {
                        col.list_state.select(Some(0));
                    }
                }
            }
            KeyCode::Char('G') => {
                if let Some(col) = self.columns.get_mut(self.active_column) {
                    if !col.tickets.is_empty() {
                        col.list_state.select(Some(col.tickets.len() - 1));
                    }
                }
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, marks: &BoardMarks) {
        let col_count = self.columns.len() as u32;
        if col_count == 0 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints((0..col_count).map(|_| Constraint::Ratio(1, col_count)))
            .split(area);

        for (i, (col, chunk)) in self.columns.iter().zip(chunks.iter()).enumerate() {
            render_column(frame, col, *chunk, i == self.active_column, marks);
        }
    }
}

fn render_column(
    frame: &mut Frame,
    col: &BoardColumn,
    area: Rect,
    is_active: bool,
    marks: &BoardMarks,
) {
    let title = format!(" {} ({}) ", col.status.display_name(), col.tickets.len());
    let border_style = if is_active {
        Style::default().fg(status_color(col.status))
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let items: Vec<ListItem> = col
        .tickets
        .iter()
        .map(|ticket| {
            let mut spans = vec![Span::styled("● ", grupo_color(ticket.grupo))];
            spans.push(Span::raw(ticket.titulo.as_str()));
            if marks.drafts.contains_key(&ticket.id) {
                spans.push(Span::styled(" ✎", Style::default().fg(Color::Yellow)));
            }
            let image_count = marks.images.get(&ticket.id).map_or(0, Vec::len);
            if image_count > 0 {
                spans.push(Span::styled(
                    format!(" [{image_count} img]"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan).bold())
        .highlight_symbol("> ");

    let mut state = col.list_state.clone();
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Aberto => Color::Red,
        Status::EmAndamento => Color::Yellow,
        Status::Fechado => Color::Green,
    }
}

fn grupo_color(grupo: Option<Grupo>) -> Style {
    let color = match grupo {
        Some(Grupo::Software) => Color::Blue,
        Some(Grupo::Hardware) => Color::Magenta,
        Some(Grupo::AjudaDuvida) => Color::Cyan,
        Some(Grupo::Suprimentos) => Color::LightGreen,
        Some(Grupo::BuscaDeImagens) => Color::LightYellow,
        Some(Grupo::Redes) => Color::LightRed,
        None => Color::DarkGray,
    };
    Style::default().fg(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilhetes_core::filter::TicketFilter;
    use bilhetes_core::ticket::{Responsavel, Tipo};
    use bilhetes_core::Zone;
    use chrono::Utc;

    fn make_ticket(id: &str, status: Status) -> Ticket {
        Ticket {
            id: id.to_string(),
            titulo: format!("Bilhete {id}"),
            descricao: String::new(),
            responsavel: Responsavel::Wilson,
            grupo: Some(Grupo::Redes),
            tipo: Some(Tipo::Preventiva),
            status,
            criadoem: Utc::now(),
        }
    }

    fn make_board() -> TicketBoard {
        let tickets = vec![
            make_ticket("a1", Status::Aberto),
            make_ticket("a2", Status::Aberto),
            make_ticket("e1", Status::EmAndamento),
            make_ticket("f1", Status::Fechado),
            make_ticket("f2", Status::Fechado),
        ];
        TicketBoard::new(Board::build(&tickets, &TicketFilter::default(), Zone::Local))
    }

    #[test]
    fn starts_on_first_ticket_of_first_column() {
        let board = make_board();
        assert_eq!(board.active_status(), Status::Aberto);
        assert_eq!(board.selected_ticket().unwrap().id, "a1");
        assert_eq!(board.column_len(Status::Fechado), 2);
    }

    #[test]
    fn select_by_id_switches_column() {
        let mut board = make_board();
        assert!(board.select_ticket_by_id("f2"));
        assert_eq!(board.active_status(), Status::Fechado);
        assert_eq!(board.selected_ticket().unwrap().id, "f2");
    }

    #[test]
    fn select_missing_keeps_cursor() {
        let mut board = make_board();
        board.select_ticket_by_id("e1");
        assert!(!board.select_ticket_by_id("zz"));
        assert_eq!(board.selected_ticket().unwrap().id, "e1");
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut board = make_board();
        board.handle_key(KeyEvent::from(KeyCode::Left));
        assert_eq!(board.active_status(), Status::Aberto);
        board.handle_key(KeyEvent::from(KeyCode::Char('G')));
        assert_eq!(board.selected_ticket().unwrap().id, "a2");
        board.handle_key(KeyEvent::from(KeyCode::Down));
        assert_eq!(board.selected_ticket().unwrap().id, "a2");
        for _ in 0..5 {
            board.handle_key(KeyEvent::from(KeyCode::Char('l')));
        }
        assert_eq!(board.active_status(), Status::Fechado);
    }

    #[test]
    fn empty_board_has_no_selection() {
        let board = TicketBoard::new(Board::build(&[], &TicketFilter::default(), Zone::Local));
        assert!(board.selected_ticket().is_none());
    }
}
