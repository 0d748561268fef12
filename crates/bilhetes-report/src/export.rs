use bilhetes_core::ticket::Ticket;
use chrono::SecondsFormat;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};

use crate::ReportError;

/// Column order of both export formats.
pub const COLUMNS: [&str; 8] = [
    "id",
    "titulo",
    "descricao",
    "responsavel",
    "grupo",
    "tipo",
    "status",
    "criadoem",
];

pub const SHEET_NAME: &str = "Bilhetes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    /// `bilhetes_2024.csv`, or `bilhetes_todos.csv` for an unrestricted export.
    pub fn file_name(&self, year: Option<i32>) -> String {
        let suffix = year.map_or_else(|| "todos".to_string(), |y| y.to_string());
        format!("bilhetes_{suffix}.{}", self.extension())
    }
}

/// One exported line: every ticket field as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: String,
    pub titulo: String,
    pub descricao: String,
    pub responsavel: String,
    pub grupo: String,
    pub tipo: String,
    pub status: String,
    pub criadoem: String,
}

impl TicketRow {
    fn cells(&self) -> [&str; 8] {
        [
            &self.id,
            &self.titulo,
            &self.descricao,
            &self.responsavel,
            &self.grupo,
            &self.tipo,
            &self.status,
            &self.criadoem,
        ]
    }
}

impl From<&Ticket> for TicketRow {
    fn from(t: &Ticket) -> Self {
        Self {
            id: t.id.clone(),
            titulo: t.titulo.clone(),
            descricao: t.descricao.clone(),
            responsavel: t.responsavel.as_str().to_string(),
            grupo: t.grupo.map(|g| g.as_str().to_string()).unwrap_or_default(),
            tipo: t.tipo.map(|k| k.as_str().to_string()).unwrap_or_default(),
            status: t.status.as_str().to_string(),
            criadoem: t.criadoem.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub fn export<'a, I>(format: ExportFormat, tickets: I) -> Result<Vec<u8>, ReportError>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    match format {
        ExportFormat::Csv => to_csv(tickets),
        ExportFormat::Xlsx => to_xlsx(tickets),
    }
}

pub fn to_csv<'a, I>(tickets: I) -> Result<Vec<u8>, ReportError>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for ticket in tickets {
        writer.serialize(TicketRow::from(ticket))?;
    }
    writer.flush().map_err(|e| ReportError::Internal(format!("flush: {e}")))?;
    writer
        .into_inner()
        .map_err(|e| ReportError::Internal(format!("csv output: {e}")))
}

pub fn from_csv(data: &[u8]) -> Result<Vec<TicketRow>, ReportError> {
    let mut reader = csv::Reader::from_reader(data);
    let rows = reader
        .deserialize::<TicketRow>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Single-sheet workbook with a bold header row.
pub fn to_xlsx<'a, I>(tickets: I) -> Result<Vec<u8>, ReportError>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (i, ticket) in tickets.into_iter().enumerate() {
        let row = TicketRow::from(ticket);
        for (col, cell) in row.cells().iter().enumerate() {
            sheet.write_string(i as u32 + 1, col as u16, *cell)?;
        }
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
