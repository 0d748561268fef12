use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use bilhetes_core::board::Board;
use bilhetes_core::filter::{parse_date, TicketFilter};
use bilhetes_core::image::TicketImage;
use bilhetes_core::ticket::{CreateTicket, Grupo, Responsavel, Status, Ticket, Tipo, UpdateTicket};
use bilhetes_report::{ExportFormat, Report};
use bilhetes_service::{BlockingHttpService, ServiceError, TicketQuery};
use bilhetes_core::Zone;
use chrono::{Datelike, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph,
    Row, Table, Tabs, Wrap,
};

use crate::components::ticket_board::{status_color, BoardMarks, TicketBoard};

/// Top-level screens, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    NovoBilhete,
    Bilhetes,
    Dashboard,
}

impl View {
    pub const ALL: &[View] = &[View::NovoBilhete, View::Bilhetes, View::Dashboard];

    pub fn title(&self) -> &'static str {
        match self {
            View::NovoBilhete => "Novo bilhete",
            View::Bilhetes => "Bilhetes",
            View::Dashboard => "Dashboard",
        }
    }

    fn index(&self) -> usize {
        View::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    fn next(&self) -> View {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }
}

/// What the app is currently doing on top of the active view.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,
    /// Result of a create attempt. Any key dismisses it.
    Message {
        title: String,
        body: String,
        is_error: bool,
    },
    /// Typing into the description draft of one ticket.
    EditDescription { ticket_id: String },
    /// Choosing the target status of a ticket.
    StatusPick { ticket_id: String, selected: usize },
    /// Typing the path of an image to attach.
    UploadPath { ticket_id: String, input: String },
    /// Editing the board filter.
    Filter(FilterForm),
}

// -- Novo bilhete --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Titulo,
    Descricao,
    Responsavel,
    Grupo,
    Tipo,
    Enviar,
}

impl FormField {
    const ORDER: &[FormField] = &[
        FormField::Titulo,
        FormField::Descricao,
        FormField::Responsavel,
        FormField::Grupo,
        FormField::Tipo,
        FormField::Enviar,
    ];

    fn is_text(&self) -> bool {
        matches!(self, FormField::Titulo | FormField::Descricao)
    }
}

/// The ticket creation form. Defaults: Erik, software, preventiva.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketForm {
    pub titulo: String,
    pub descricao: String,
    pub responsavel: Responsavel,
    pub grupo: Grupo,
    pub tipo: Tipo,
    pub focus: FormField,
}

impl Default for TicketForm {
    fn default() -> Self {
        Self {
            titulo: String::new(),
            descricao: String::new(),
            responsavel: Responsavel::Erik,
            grupo: Grupo::Software,
            tipo: Tipo::Preventiva,
            focus: FormField::Titulo,
        }
    }
}

impl TicketForm {
    pub fn to_create(&self) -> CreateTicket {
        CreateTicket {
            titulo: self.titulo.clone(),
            descricao: self.descricao.clone(),
            responsavel: self.responsavel,
            grupo: self.grupo,
            tipo: self.tipo,
            status: Status::Aberto,
            criadoem: None,
        }
    }

    fn move_focus(&mut self, forward: bool) {
        self.focus = cycle(FormField::ORDER, self.focus, forward);
    }

    fn cycle_choice(&mut self, forward: bool) {
        match self.focus {
            FormField::Responsavel => {
                self.responsavel = cycle(Responsavel::ALL, self.responsavel, forward)
            }
            FormField::Grupo => self.grupo = cycle(Grupo::ALL, self.grupo, forward),
            FormField::Tipo => self.tipo = cycle(Tipo::ALL, self.tipo, forward),
            _ => {}
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Titulo => Some(&mut self.titulo),
            FormField::Descricao => Some(&mut self.descricao),
            _ => None,
        }
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    let len = all.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    all[next]
}

/// Cycle through `None` followed by every value in `all`.
fn cycle_opt<T: Copy + PartialEq>(all: &[T], current: Option<T>, forward: bool) -> Option<T> {
    let mut options: Vec<Option<T>> = vec![None];
    options.extend(all.iter().copied().map(Some));
    cycle(&options, current, forward)
}

// -- Bilhetes --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Titulo,
    Grupo,
    Tipo,
    Status,
    DataInicio,
    DataFim,
}

impl FilterField {
    const ORDER: &[FilterField] = &[
        FilterField::Titulo,
        FilterField::Grupo,
        FilterField::Tipo,
        FilterField::Status,
        FilterField::DataInicio,
        FilterField::DataFim,
    ];
}

/// Filter being edited. Dates stay as text until applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterForm {
    pub focus: FilterField,
    pub titulo: String,
    pub grupo: Option<Grupo>,
    pub tipo: Option<Tipo>,
    pub status: Option<Status>,
    pub data_inicio: String,
    pub data_fim: String,
}

impl FilterForm {
    fn from_filter(filter: &TicketFilter) -> Self {
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        };
        Self {
            focus: FilterField::Titulo,
            titulo: filter.titulo.clone(),
            grupo: filter.grupo,
            tipo: filter.tipo,
            status: filter.status,
            data_inicio: date(filter.data_inicio),
            data_fim: date(filter.data_fim),
        }
    }

    fn to_filter(&self) -> Result<TicketFilter, String> {
        let date = |s: &str| {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                parse_date(s).map(Some).map_err(|e| e.to_string())
            }
        };
        Ok(TicketFilter {
            titulo: self.titulo.clone(),
            grupo: self.grupo,
            tipo: self.tipo,
            status: self.status,
            data_inicio: date(&self.data_inicio)?,
            data_fim: date(&self.data_fim)?,
        })
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FilterField::Titulo => Some(&mut self.titulo),
            FilterField::DataInicio => Some(&mut self.data_inicio),
            FilterField::DataFim => Some(&mut self.data_fim),
            _ => None,
        }
    }

    fn move_focus(&mut self, forward: bool) {
        self.focus = cycle(FilterField::ORDER, self.focus, forward);
    }

    fn cycle_choice(&mut self, forward: bool) {
        match self.focus {
            FilterField::Grupo => self.grupo = cycle_opt(Grupo::ALL, self.grupo, forward),
            FilterField::Tipo => self.tipo = cycle_opt(Tipo::ALL, self.tipo, forward),
            FilterField::Status => self.status = cycle_opt(Status::ALL, self.status, forward),
            _ => {}
        }
    }
}

/// Everything the board view shows. Rebuilt by [`BoardState::refresh`].
pub struct BoardState {
    tickets: Vec<Ticket>,
    images: HashMap<String, Vec<TicketImage>>,
    filter: TicketFilter,
    board: TicketBoard,
    /// Description drafts of tickets in edit state, keyed by ticket id.
    drafts: HashMap<String, String>,
    zone: Zone,
}

impl BoardState {
    fn load(service: &BlockingHttpService, zone: Zone) -> Result<Self, ServiceError> {
        let mut state = Self {
            tickets: Vec::new(),
            images: HashMap::new(),
            filter: TicketFilter::default(),
            board: TicketBoard::new(Board::build(&[], &TicketFilter::default(), zone)),
            drafts: HashMap::new(),
            zone,
        };
        state.refresh(service)?;
        Ok(state)
    }

    /// Re-fetch tickets and images, keeping the cursor on the same ticket.
    pub fn refresh(&mut self, service: &BlockingHttpService) -> Result<(), ServiceError> {
        self.tickets = service.list_tickets(&TicketQuery::default())?;
        self.images = service.list_images()?;
        self.rebuild();
        Ok(())
    }

    fn rebuild(&mut self) {
        let selected = self.board.selected_ticket().map(|t| t.id.clone());
        self.board = TicketBoard::new(Board::build(&self.tickets, &self.filter, self.zone));
        if let Some(id) = selected {
            self.board.select_ticket_by_id(&id);
        }
    }

    fn set_filter(&mut self, filter: TicketFilter) {
        self.filter = filter;
        self.rebuild();
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn filter(&self) -> &TicketFilter {
        &self.filter
    }

    pub fn board(&self) -> &TicketBoard {
        &self.board
    }

    pub fn images(&self, ticket_id: &str) -> &[TicketImage] {
        self.images.get(ticket_id).map_or(&[], Vec::as_slice)
    }

    pub fn draft(&self, ticket_id: &str) -> Option<&str> {
        self.drafts.get(ticket_id).map(String::as_str)
    }

    pub fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }
}

// -- Dashboard --

pub struct DashboardState {
    year: Option<i32>,
    report: Report,
    zone: Zone,
}

impl DashboardState {
    /// Starts on the current year as seen from `zone`.
    fn load(service: &BlockingHttpService, zone: Zone) -> Result<Self, ServiceError> {
        let year = Some(zone.date_of(&Utc::now()).year());
        Ok(Self {
            year,
            report: service.report(year, zone)?,
            zone,
        })
    }

    pub fn refresh(&mut self, service: &BlockingHttpService) -> Result<(), ServiceError> {
        self.report = service.report(self.year, self.zone)?;
        Ok(())
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// "Todos" followed by every year with tickets. A selected year with no
    /// tickets stays selectable.
    pub fn year_options(&self) -> Vec<Option<i32>> {
        let mut years = self.report.anos.clone();
        if let Some(y) = self.year {
            if !years.contains(&y) {
                years.push(y);
                years.sort_unstable();
            }
        }
        std::iter::once(None).chain(years.into_iter().map(Some)).collect()
    }
}

// -- App --

pub struct App {
    service: BlockingHttpService,
    view: View,
    mode: Mode,
    form: TicketForm,
    board: BoardState,
    dashboard: DashboardState,
    export_dir: PathBuf,
    status_message: Option<String>,
    zone: Zone,
}

impl App {
    pub fn new(service: BlockingHttpService) -> Result<Self> {
        Self::new_in_zone(service, Zone::Local)
    }

    /// Days, months and years on every view are taken in `zone`.
    pub fn new_in_zone(service: BlockingHttpService, zone: Zone) -> Result<Self> {
        let board = BoardState::load(&service, zone)?;
        let dashboard = DashboardState::load(&service, zone)?;
        Ok(Self {
            service,
            view: View::NovoBilhete,
            mode: Mode::Normal,
            form: TicketForm::default(),
            board,
            dashboard,
            export_dir: PathBuf::from("."),
            status_message: None,
            zone,
        })
    }

    /// Directory dashboard exports are written to.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn form(&self) -> &TicketForm {
        &self.form
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn dashboard(&self) -> &DashboardState {
        &self.dashboard
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// While true, printable keys are text and `q` does not quit.
    pub fn is_input_mode(&self) -> bool {
        match &self.mode {
            Mode::Normal => self.view == View::NovoBilhete && self.form.focus.is_text(),
            Mode::EditDescription { .. } | Mode::UploadPath { .. } | Mode::Filter(_) => true,
            Mode::Message { .. } | Mode::StatusPick { .. } => false,
        }
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
        match view {
            View::NovoBilhete => {}
            View::Bilhetes => self.refresh_board(),
            View::Dashboard => self.refresh_dashboard(),
        }
    }

    fn refresh_board(&mut self) {
        if let Err(e) = self.board.refresh(&self.service) {
            tracing::warn!(error = %e, "board refresh failed");
            self.status_message = Some(format!("Erro ao carregar bilhetes: {e}"));
        }
    }

    fn refresh_dashboard(&mut self) {
        if let Err(e) = self.dashboard.refresh(&self.service) {
            tracing::warn!(error = %e, "report refresh failed");
            self.status_message = Some(format!("Erro ao carregar relatório: {e}"));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        match self.mode.clone() {
            Mode::Normal => self.handle_normal(key),
            Mode::Message { .. } => self.mode = Mode::Normal,
            Mode::EditDescription { ticket_id } => self.handle_edit_description(key, ticket_id),
            Mode::StatusPick {
                ticket_id,
                selected,
            } => self.handle_status_pick(key, ticket_id, selected),
            Mode::UploadPath { ticket_id, input } => self.handle_upload_path(key, ticket_id, input),
            Mode::Filter(form) => self.handle_filter(key, form),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Tab {
            self.set_view(self.view.next());
            return;
        }
        if !self.is_input_mode() {
            let target = match key.code {
                KeyCode::Char('1') => Some(View::NovoBilhete),
                KeyCode::Char('2') => Some(View::Bilhetes),
                KeyCode::Char('3') => Some(View::Dashboard),
                _ => None,
            };
            if let Some(view) = target {
                self.set_view(view);
                return;
            }
        }
        match self.view {
            View::NovoBilhete => self.handle_form(key),
            View::Bilhetes => self.handle_board(key),
            View::Dashboard => self.handle_dashboard(key),
        }
    }

    // -- Novo bilhete --

    fn handle_form(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.submit_form();
            return;
        }
        match key.code {
            KeyCode::Down => self.form.move_focus(true),
            KeyCode::Up | KeyCode::BackTab => self.form.move_focus(false),
            KeyCode::Enter => match self.form.focus {
                FormField::Enviar => self.submit_form(),
                FormField::Descricao => self.form.descricao.push('\n'),
                _ => self.form.move_focus(true),
            },
            KeyCode::Esc if self.form.focus.is_text() => self.form.move_focus(true),
            KeyCode::Backspace => {
                if let Some(text) = self.form.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Left | KeyCode::Char('h') if !self.form.focus.is_text() => {
                self.form.cycle_choice(false)
            }
            KeyCode::Right | KeyCode::Char('l') if !self.form.focus.is_text() => {
                self.form.cycle_choice(true)
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.form.text_mut() {
                    text.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        match self.service.create_ticket(&self.form.to_create()) {
            Ok(ticket) => {
                tracing::info!(id = %ticket.id, "ticket created from form");
                self.form = TicketForm::default();
                self.mode = Mode::Message {
                    title: "Bilhete criado".into(),
                    body: format!("\"{}\" registrado com sucesso.", ticket.titulo),
                    is_error: false,
                };
                self.refresh_board();
                self.refresh_dashboard();
            }
            Err(e) => {
                tracing::warn!(error = %e, "ticket creation failed");
                self.mode = Mode::Message {
                    title: "Erro ao criar bilhete".into(),
                    body: e.to_string(),
                    is_error: true,
                };
            }
        }
    }

    // -- Bilhetes --

    fn handle_board(&mut self, key: KeyEvent) {
        let selected = self.board.board.selected_ticket().cloned();
        match key.code {
            KeyCode::Char('r') => self.refresh_board(),
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.mode = Mode::Filter(FilterForm::from_filter(&self.board.filter));
            }
            KeyCode::Char('c') => {
                let mut filter = self.board.filter.clone();
                filter.clear();
                self.board.set_filter(filter);
                self.status_message = Some("Filtros limpos".into());
            }
            KeyCode::Char('s') | KeyCode::Enter => {
                if let Some(ticket) = selected {
                    let selected = Status::ALL
                        .iter()
                        .position(|s| *s == ticket.status)
                        .unwrap_or(0);
                    self.mode = Mode::StatusPick {
                        ticket_id: ticket.id,
                        selected,
                    };
                }
            }
            KeyCode::Char('e') => {
                if let Some(ticket) = selected {
                    self.board
                        .drafts
                        .entry(ticket.id.clone())
                        .or_insert_with(|| ticket.descricao.clone());
                    self.mode = Mode::EditDescription {
                        ticket_id: ticket.id,
                    };
                }
            }
            KeyCode::Char('u') => {
                if let Some(ticket) = selected {
                    self.mode = Mode::UploadPath {
                        ticket_id: ticket.id,
                        input: String::new(),
                    };
                }
            }
            _ => self.board.board.handle_key(key),
        }
    }

    fn handle_edit_description(&mut self, key: KeyEvent, ticket_id: String) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => self.save_description(&ticket_id),
            // Leave the editor but keep the draft for later.
            KeyCode::Char('o') if ctrl => self.mode = Mode::Normal,
            KeyCode::Esc => {
                self.board.drafts.remove(&ticket_id);
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => self.push_draft(&ticket_id, Some('\n')),
            KeyCode::Backspace => self.push_draft(&ticket_id, None),
            KeyCode::Char(c) => self.push_draft(&ticket_id, Some(c)),
            _ => {}
        }
    }

    fn push_draft(&mut self, ticket_id: &str, c: Option<char>) {
        if let Some(draft) = self.board.drafts.get_mut(ticket_id) {
            match c {
                Some(c) => draft.push(c),
                None => {
                    draft.pop();
                }
            }
        }
    }

    fn save_description(&mut self, ticket_id: &str) {
        let Some(draft) = self.board.drafts.get(ticket_id).cloned() else {
            self.mode = Mode::Normal;
            return;
        };
        let update = UpdateTicket {
            descricao: Some(draft),
            ..Default::default()
        };
        match self.service.update_ticket(ticket_id, &update) {
            Ok(_) => {
                self.board.drafts.remove(ticket_id);
                self.mode = Mode::Normal;
                self.status_message = Some("Descrição salva".into());
                self.refresh_board();
            }
            Err(e) => {
                // Draft and edit mode stay so nothing typed is lost.
                tracing::warn!(ticket_id, error = %e, "description update failed");
                self.status_message = Some(format!("Erro ao salvar descrição: {e}"));
            }
        }
    }

    fn handle_status_pick(&mut self, key: KeyEvent, ticket_id: String, selected: usize) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Char('j') | KeyCode::Down => {
                self.mode = Mode::StatusPick {
                    ticket_id,
                    selected: (selected + 1).min(Status::ALL.len() - 1),
                };
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.mode = Mode::StatusPick {
                    ticket_id,
                    selected: selected.saturating_sub(1),
                };
            }
            KeyCode::Enter => {
                let status = Status::ALL[selected.min(Status::ALL.len() - 1)];
                self.mode = Mode::Normal;
                self.change_status(&ticket_id, status);
            }
            _ => {}
        }
    }

    fn change_status(&mut self, ticket_id: &str, status: Status) {
        let update = UpdateTicket {
            status: Some(status),
            ..Default::default()
        };
        match self.service.update_ticket(ticket_id, &update) {
            Ok(ticket) => {
                self.status_message = Some(format!(
                    "\"{}\" agora está {}",
                    ticket.titulo,
                    status.display_name()
                ));
                self.refresh_board();
                self.board.board.select_ticket_by_id(ticket_id);
            }
            Err(e) => {
                tracing::warn!(ticket_id, error = %e, "status update failed");
                self.status_message = Some(format!("Erro ao alterar status: {e}"));
            }
        }
    }

    fn handle_upload_path(&mut self, key: KeyEvent, ticket_id: String, mut input: String) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let path = input.trim();
                if !path.is_empty() {
                    self.upload_file(&ticket_id, Path::new(path));
                }
            }
            KeyCode::Backspace => {
                input.pop();
                self.mode = Mode::UploadPath { ticket_id, input };
            }
            KeyCode::Char(c) => {
                input.push(c);
                self.mode = Mode::UploadPath { ticket_id, input };
            }
            _ => {}
        }
    }

    /// Read `path` and attach it to the ticket. Failures leave local state untouched.
    pub fn upload_file(&mut self, ticket_id: &str, path: &Path) {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let result = std::fs::read(path)
            .map_err(|e| ServiceError::InvalidInput(format!("{}: {e}", path.display())))
            .and_then(|data| self.service.upload_image(ticket_id, &filename, data));
        match result {
            Ok(image) => {
                self.status_message = Some(format!("Imagem enviada: {}", image.url));
                self.board
                    .images
                    .entry(ticket_id.to_string())
                    .or_default()
                    .push(image);
            }
            Err(e) => {
                tracing::warn!(
                    ticket_id,
                    path = %path.display(),
                    error = %e,
                    "image upload failed"
                );
                self.status_message = Some(format!("Erro ao enviar imagem: {e}"));
            }
        }
    }

    fn handle_filter(&mut self, key: KeyEvent, mut form: FilterForm) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                return;
            }
            KeyCode::Enter => {
                match form.to_filter() {
                    Ok(filter) => {
                        self.board.set_filter(filter);
                        self.mode = Mode::Normal;
                    }
                    Err(e) => {
                        self.status_message = Some(format!("Filtro inválido: {e}"));
                        self.mode = Mode::Filter(form);
                    }
                }
                return;
            }
            KeyCode::Down | KeyCode::Tab => form.move_focus(true),
            KeyCode::Up | KeyCode::BackTab => form.move_focus(false),
            KeyCode::Left => form.cycle_choice(false),
            KeyCode::Right => form.cycle_choice(true),
            KeyCode::Backspace => {
                if let Some(text) = form.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = form.text_mut() {
                    text.push(c);
                }
            }
            _ => {}
        }
        self.mode = Mode::Filter(form);
    }

    // -- Dashboard --

    fn handle_dashboard(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.step_year(false),
            KeyCode::Char('l') | KeyCode::Right => self.step_year(true),
            KeyCode::Char('r') => self.refresh_dashboard(),
            KeyCode::Char('c') => self.export(ExportFormat::Csv),
            KeyCode::Char('x') => self.export(ExportFormat::Xlsx),
            _ => {}
        }
    }

    fn step_year(&mut self, forward: bool) {
        let options = self.dashboard.year_options();
        self.dashboard.year = cycle(&options, self.dashboard.year, forward);
        self.refresh_dashboard();
    }

    pub fn select_year(&mut self, year: Option<i32>) {
        self.dashboard.year = year;
        self.refresh_dashboard();
    }

    fn export(&mut self, format: ExportFormat) {
        let year = self.dashboard.year;
        let path = self.export_dir.join(format.file_name(year));
        let result = self
            .service
            .export(format, &TicketQuery::year(year).in_zone(self.zone))
            .map_err(|e| e.to_string())
            .and_then(|data| std::fs::write(&path, data).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "export written");
                self.status_message = Some(format!("Exportado para {}", path.display()));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "export failed");
                self.status_message = Some(format!("Erro ao exportar: {e}"));
            }
        }
    }

    // -- Rendering --

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_tabs(frame, layout[0]);
        match self.view {
            View::NovoBilhete => self.render_form(frame, layout[1]),
            View::Bilhetes => self.render_board(frame, layout[1]),
            View::Dashboard => self.render_dashboard(frame, layout[1]),
        }
        self.render_status_bar(frame, layout[2]);

        match &self.mode {
            Mode::Message {
                title,
                body,
                is_error,
            } => render_message(frame, title, body, *is_error, area),
            Mode::StatusPick { selected, .. } => render_status_pick(frame, *selected, area),
            Mode::UploadPath { input, .. } => {
                render_input_bar(frame, "Caminho da imagem: ", input, area)
            }
            Mode::Filter(form) => render_filter(frame, form, area),
            Mode::Normal | Mode::EditDescription { .. } => {}
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = View::ALL
            .iter()
            .enumerate()
            .map(|(i, v)| Line::from(format!("{} {}", i + 1, v.title())))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.view.index())
            .style(Style::default().fg(Color::DarkGray))
            .highlight_style(Style::default().fg(Color::Cyan).bold());
        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let text = if let Some(msg) = &self.status_message {
            msg.clone()
        } else {
            let hints = match (&self.mode, self.view) {
                (Mode::EditDescription { .. }, _) => {
                    "Ctrl+S salvar  Ctrl+O manter rascunho  Esc descartar"
                }
                (Mode::Filter(_), _) => "↑↓ campo  ←→ opção  Enter aplicar  Esc cancelar",
                (Mode::StatusPick { .. }, _) => "j/k escolher  Enter confirmar  Esc cancelar",
                (_, View::NovoBilhete) => "↑↓ campo  ←→ opção  Ctrl+S enviar  Tab trocar tela",
                (_, View::Bilhetes) => {
                    "s status  e descrição  u imagem  f filtrar  c limpar  r recarregar  q sair"
                }
                (_, View::Dashboard) => "←→ ano  c CSV  x Excel  r recarregar  q sair",
            };
            hints.to_string()
        };
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::Gray)),
            area,
        );
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let form = &self.form;
        let field_style = |field: FormField| {
            if form.focus == field {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default()
            }
        };
        let cursor = |field: FormField| if form.focus == field { "█" } else { "" };

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Título:       ", field_style(FormField::Titulo)),
                Span::raw(format!("{}{}", form.titulo, cursor(FormField::Titulo))),
            ]),
            Line::from(Span::styled("Descrição:", field_style(FormField::Descricao))),
        ];
        for line in format!("{}{}", form.descricao, cursor(FormField::Descricao)).lines() {
            lines.push(Line::from(format!("  {line}")));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Responsável:  ", field_style(FormField::Responsavel)),
            Span::raw(format!("◀ {} ▶", form.responsavel)),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Grupo:        ", field_style(FormField::Grupo)),
            Span::raw(format!("◀ {} ▶", form.grupo.display_name())),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Tipo:         ", field_style(FormField::Tipo)),
            Span::raw(format!("◀ {} ▶", form.tipo.display_name())),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "[ Enviar ]",
            field_style(FormField::Enviar),
        )));

        let block = Block::default()
            .title(" Novo bilhete ")
            .borders(Borders::ALL);
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_board(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);
        frame.render_widget(
            Paragraph::new(filter_summary(&self.board.filter))
                .style(Style::default().fg(Color::DarkGray)),
            chunks[0],
        );

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);
        let marks = BoardMarks {
            drafts: &self.board.drafts,
            images: &self.board.images,
        };
        self.board.board.render(frame, body[0], &marks);
        self.render_ticket_detail(frame, body[1]);
    }

    fn render_ticket_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title(" Detalhes ").borders(Borders::ALL);
        let Some(ticket) = self.board.board.selected_ticket() else {
            frame.render_widget(Paragraph::new("Nenhum bilhete").block(block), area);
            return;
        };

        let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
        let mut lines = vec![
            Line::from(Span::styled(ticket.titulo.as_str(), Style::default().bold())),
            Line::from(vec![
                label("Status: "),
                Span::styled(
                    ticket.status.display_name(),
                    Style::default().fg(status_color(ticket.status)),
                ),
            ]),
            Line::from(vec![label("Responsável: "), Span::raw(ticket.responsavel.as_str())]),
            Line::from(vec![
                label("Grupo: "),
                Span::raw(ticket.grupo.map_or("-", |g| g.display_name())),
            ]),
            Line::from(vec![
                label("Tipo: "),
                Span::raw(ticket.tipo.map_or("-", |t| t.display_name())),
            ]),
            Line::from(vec![
                label("Criado em: "),
                Span::raw(
                    self.zone
                        .naive_local(&ticket.criadoem)
                        .format("%d/%m/%Y %H:%M")
                        .to_string(),
                ),
            ]),
            Line::from(""),
        ];

        let editing = matches!(
            &self.mode,
            Mode::EditDescription { ticket_id } if *ticket_id == ticket.id
        );
        match self.board.draft(&ticket.id) {
            Some(draft) => {
                let title = if editing {
                    "Descrição (editando):"
                } else {
                    "Descrição (rascunho):"
                };
                lines.push(Line::from(Span::styled(
                    title,
                    Style::default().fg(Color::Yellow),
                )));
                let text = if editing {
                    format!("{draft}█")
                } else {
                    draft.to_string()
                };
                lines.extend(text.lines().map(|l| Line::from(l.to_string())));
            }
            None => {
                lines.push(Line::from(label("Descrição:")));
                lines.extend(ticket.descricao.lines().map(|l| Line::from(l.to_string())));
            }
        }

        let images = self.board.images(&ticket.id);
        if !images.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(label("Imagens:")));
            for image in images {
                lines.push(Line::from(format!("• {}", image.url)));
            }
        }

        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_dashboard(&self, frame: &mut Frame, area: Rect) {
        let report = &self.dashboard.report;
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Percentage(45),
                Constraint::Min(0),
            ])
            .split(area);

        let selector: Vec<Span> = self
            .dashboard
            .year_options()
            .into_iter()
            .flat_map(|y| {
                let text = y.map_or_else(|| "Todos".to_string(), |y| y.to_string());
                let style = if y == self.dashboard.year {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                [Span::styled(format!(" {text} "), style), Span::raw(" ")]
            })
            .collect();
        let mut header = vec![Span::raw("Ano: ")];
        header.extend(selector);
        frame.render_widget(Paragraph::new(Line::from(header)), rows[0]);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(35),
                Constraint::Percentage(35),
            ])
            .split(rows[1]);
        render_summary(frame, report, top[0]);
        let grupo_bars: Vec<(String, u64)> = report
            .por_grupo
            .iter()
            .map(|c| (c.value.display_name().to_string(), c.count as u64))
            .collect();
        render_bars(frame, " Por grupo ", &grupo_bars, top[1]);
        let tipo_bars: Vec<(String, u64)> = report
            .por_tipo
            .iter()
            .map(|c| (c.value.display_name().to_string(), c.count as u64))
            .collect();
        render_bars(frame, " Por tipo ", &tipo_bars, top[2]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        let grupo_rows: Vec<(&str, [usize; 12])> = report
            .mensal_grupo
            .iter()
            .map(|s| (s.value.display_name(), s.months))
            .collect();
        render_monthly(frame, " Mensal por grupo ", &grupo_rows, bottom[0]);
        let tipo_rows: Vec<(&str, [usize; 12])> = report
            .mensal_tipo
            .iter()
            .map(|s| (s.value.display_name(), s.months))
            .collect();
        render_monthly(frame, " Mensal por tipo ", &tipo_rows, bottom[1]);
    }
}

fn filter_summary(filter: &TicketFilter) -> String {
    if filter.is_empty() {
        return "Sem filtros".into();
    }
    let mut parts = Vec::new();
    if !filter.titulo.is_empty() {
        parts.push(format!("título~\"{}\"", filter.titulo));
    }
    if let Some(g) = filter.grupo {
        parts.push(format!("grupo={}", g.display_name()));
    }
    if let Some(t) = filter.tipo {
        parts.push(format!("tipo={}", t.display_name()));
    }
    if let Some(s) = filter.status {
        parts.push(format!("status={}", s.display_name()));
    }
    if let Some(d) = filter.data_inicio {
        parts.push(format!("de {}", d.format("%d/%m/%Y")));
    }
    if let Some(d) = filter.data_fim {
        parts.push(format!("até {}", d.format("%d/%m/%Y")));
    }
    format!("Filtros: {}", parts.join(", "))
}

/// The textual "Relatório" block.
fn render_summary(frame: &mut Frame, report: &Report, area: Rect) {
    let scope = report
        .year
        .map_or_else(|| "todos os anos".to_string(), |y| y.to_string());
    let mut lines = vec![
        Line::from(format!("Total ({scope}): {}", report.total)),
        Line::from(""),
    ];
    for c in &report.por_grupo {
        lines.push(Line::from(format!(
            "{}: {} ({:.1}%)",
            c.value.display_name(),
            c.count,
            c.percentage
        )));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().title(" Relatório ").borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_bars(frame: &mut Frame, title: &str, data: &[(String, u64)], area: Rect) {
    let bars: Vec<Bar> = data
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .label(Line::from(abbreviate(label)))
                .value(*value)
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    frame.render_widget(chart, area);
}

fn abbreviate(label: &str) -> String {
    label.chars().take(6).collect()
}

fn render_monthly(frame: &mut Frame, title: &str, rows: &[(&str, [usize; 12])], area: Rect) {
    const MONTHS: [&str; 12] = [
        "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
    ];
    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(MONTHS.iter().map(|m| Cell::from(*m)))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().bold());
    let body: Vec<Row> = rows
        .iter()
        .map(|(name, months)| {
            let cells = std::iter::once(Cell::from(abbreviate(name)))
                .chain(months.iter().map(|n| {
                    let style = if *n > 0 {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    Cell::from(n.to_string()).style(style)
                }))
                .collect::<Vec<_>>();
            Row::new(cells)
        })
        .collect();
    let widths = std::iter::once(Constraint::Length(7))
        .chain(std::iter::repeat(Constraint::Length(3)).take(12));
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_message(frame: &mut Frame, title: &str, body: &str, is_error: bool, area: Rect) {
    let popup = centered_rect(50, 25, area);
    let color = if is_error { Color::Red } else { Color::Green };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(body.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "qualquer tecla para fechar",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(format!(" {title} "))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        ),
        popup,
    );
}

fn render_status_pick(frame: &mut Frame, selected: usize, area: Rect) {
    let popup = centered_rect(30, 25, area);
    let items: Vec<ListItem> = Status::ALL
        .iter()
        .map(|s| {
            ListItem::new(Span::styled(
                s.display_name(),
                Style::default().fg(status_color(*s)),
            ))
        })
        .collect();
    let mut state = ListState::default();
    state.select(Some(selected));
    let list = List::new(items)
        .block(Block::default().title(" Alterar status ").borders(Borders::ALL))
        .highlight_symbol("> ")
        .highlight_style(Style::default().bold().reversed());
    frame.render_widget(Clear, popup);
    frame.render_stateful_widget(list, popup, &mut state);
}

fn render_input_bar(frame: &mut Frame, label: &str, input: &str, area: Rect) {
    let bar = Rect {
        x: area.x,
        y: area.bottom().saturating_sub(3),
        width: area.width,
        height: 3.min(area.height),
    };
    frame.render_widget(Clear, bar);
    frame.render_widget(
        Paragraph::new(format!("{label}{input}█"))
            .block(Block::default().borders(Borders::ALL)),
        bar,
    );
}

fn render_filter(frame: &mut Frame, form: &FilterForm, area: Rect) {
    let popup = centered_rect(50, 40, area);
    let style = |f: FilterField| {
        if form.focus == f {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default()
        }
    };
    let choice = |v: Option<&str>| format!("◀ {} ▶", v.unwrap_or("Todos"));
    let lines = vec![
        Line::from(vec![
            Span::styled("Título:      ", style(FilterField::Titulo)),
            Span::raw(form.titulo.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Grupo:       ", style(FilterField::Grupo)),
            Span::raw(choice(form.grupo.map(|g| g.display_name()))),
        ]),
        Line::from(vec![
            Span::styled("Tipo:        ", style(FilterField::Tipo)),
            Span::raw(choice(form.tipo.map(|t| t.display_name()))),
        ]),
        Line::from(vec![
            Span::styled("Status:      ", style(FilterField::Status)),
            Span::raw(choice(form.status.map(|s| s.display_name()))),
        ]),
        Line::from(vec![
            Span::styled("Data início: ", style(FilterField::DataInicio)),
            Span::raw(form.data_inicio.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Data fim:    ", style(FilterField::DataFim)),
            Span::raw(form.data_fim.as_str()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "datas no formato AAAA-MM-DD",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(" Filtros ").borders(Borders::ALL)),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
