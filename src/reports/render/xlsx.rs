use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{CrmError, Result};
use crate::models::ReportTable;

const MAX_COLUMN_WIDTH: usize = 50;
const MAX_ROWS: usize = 1_048_575;

pub fn render(table: &ReportTable) -> Result<Vec<u8>> {
    if table.rows.len() > MAX_ROWS {
        return Err(CrmError::Render(format!(
            "xlsx: {} rows exceed the sheet limit",
            table.rows.len()
        )));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&table.title)).map_err(render_error)?;

        for (col, header) in table.headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header, &header_format)
                .map_err(render_error)?;
        }

        for (row_index, row) in table.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                worksheet
                    .write_string(row_index as u32 + 1, col as u16, cell)
                    .map_err(render_error)?;
            }
        }

        for (col, width) in column_widths(table).into_iter().enumerate() {
            worksheet
                .set_column_width(col as u16, width as f64)
                .map_err(render_error)?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(render_error)?;
    }

    workbook.save_to_buffer().map_err(render_error)
}

fn render_error(err: XlsxError) -> CrmError {
    CrmError::Render(format!("xlsx: {}", err))
}

/// Longest cell in each column plus padding, capped
fn column_widths(table: &ReportTable) -> Vec<usize> {
    (0..table.column_count())
        .map(|col| {
            let longest = std::iter::once(&table.headers[col])
                .chain(table.rows.iter().filter_map(|row| row.get(col)))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Sheet names are limited to 31 characters and exclude `[]:*?/\`
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !"[]:*?/\\".contains(*c))
        .take(31)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();

    if cleaned.is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_produces_zip_container() {
        let mut table = ReportTable::new("Client list", ["ID", "Name"]);
        table.push_row(["1", "Ana"]);

        let bytes = render(&table).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_column_widths_are_capped() {
        let mut table = ReportTable::new("t", ["ID", "Notes"]);
        table.push_row(["12345".to_string(), "x".repeat(200)]);

        assert_eq!(column_widths(&table), vec![7, MAX_COLUMN_WIDTH]);
    }

    #[test]
    fn test_sheet_name_is_sanitized() {
        assert_eq!(sheet_name("Stats: 2024/Q1"), "Stats 2024Q1");
        assert_eq!(sheet_name("[]"), "Report");
        assert_eq!(sheet_name(&"a".repeat(40)).len(), 31);
    }
}
