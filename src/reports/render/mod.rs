mod delimited;
mod pdf;
mod xlsx;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ReportFormat, ReportTable};

/// Render a table into the bytes of a file in the given format. Nothing is
/// written to disk here.
pub fn render(table: &ReportTable, format: ReportFormat, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    match format {
        ReportFormat::Pdf => pdf::render(table, generated_at),
        ReportFormat::Xlsx => xlsx::render(table),
        ReportFormat::Csv => delimited::render(table),
    }
}
