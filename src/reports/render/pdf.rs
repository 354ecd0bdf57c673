use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::error::{CrmError, Result};
use crate::models::ReportTable;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;
const TITLE_SIZE: f32 = 16.0;
const TEXT_SIZE: f32 = 9.0;
// Average Helvetica glyph width at TEXT_SIZE, in mm
const CHAR_WIDTH: f32 = 1.7;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Lays the table out on as many A4 pages as needed, repeating the header
/// row on each page.
pub fn render(table: &ReportTable, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        table.title.as_str(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_error)?,
    };

    let columns = table.column_count().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
    let max_chars = ((column_width / CHAR_WIDTH) as usize).max(4);

    let mut layer = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;

    layer.use_text(table.title.as_str(), TITLE_SIZE, Mm(MARGIN), Mm(y), &fonts.bold);
    y -= LINE_HEIGHT * 2.0;
    write_row(&layer, &table.headers, y, column_width, max_chars, &fonts.bold);
    y -= LINE_HEIGHT;

    for row in &table.rows {
        if y < MARGIN + LINE_HEIGHT * 3.0 {
            layer = new_page(&doc);
            y = PAGE_HEIGHT - MARGIN;
            write_row(&layer, &table.headers, y, column_width, max_chars, &fonts.bold);
            y -= LINE_HEIGHT;
        }
        write_row(&layer, row, y, column_width, max_chars, &fonts.regular);
        y -= LINE_HEIGHT;
    }

    if y < MARGIN + LINE_HEIGHT * 2.0 {
        layer = new_page(&doc);
        y = PAGE_HEIGHT - MARGIN;
    }
    y -= LINE_HEIGHT;
    layer.use_text(
        format!("Rows: {}", table.rows.len()),
        TEXT_SIZE,
        Mm(MARGIN),
        Mm(y),
        &fonts.regular,
    );
    layer.use_text(
        format!("Generated on {}", generated_at.format("%d/%m/%Y at %H:%M UTC")),
        TEXT_SIZE,
        Mm(MARGIN),
        Mm(y - LINE_HEIGHT),
        &fonts.regular,
    );

    doc.save_to_bytes().map_err(render_error)
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn write_row(
    layer: &PdfLayerReference,
    cells: &[String],
    y: f32,
    column_width: f32,
    max_chars: usize,
    font: &IndirectFontRef,
) {
    for (col, cell) in cells.iter().enumerate() {
        let x = MARGIN + column_width * col as f32;
        layer.use_text(fit(cell, max_chars), TEXT_SIZE, Mm(x), Mm(y), font);
    }
}

fn fit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn render_error<E: std::fmt::Display>(err: E) -> CrmError {
    CrmError::Render(format!("pdf: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_produces_pdf_document() {
        let mut table = ReportTable::new("Client report", ["Field", "Value"]);
        table.push_row(["Name", "Ana"]);

        let bytes = render(&table, Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_tables_span_pages() {
        let mut table = ReportTable::new("Client list", ["ID", "Name", "Email"]);
        for i in 0..200 {
            table.push_row([i.to_string(), format!("Client {}", i), format!("c{}@example.com", i)]);
        }

        let short = render(&ReportTable::new("Client list", ["ID"]), Utc::now()).unwrap();
        let long = render(&table, Utc::now()).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }

    #[test]
    fn test_fit_truncates() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("a much longer value", 8), "a muc...");
    }
}
