//! Dashboard aggregation and spreadsheet export over an in-memory ticket list.

pub mod export;
pub mod stats;

pub use export::{ExportFormat, TicketRow};
pub use stats::{available_years, CategoryCount, MonthlySeries, Report};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("export error: {0}")]
    Internal(String),
}
