use crate::error::{CrmError, Result};
use crate::models::ReportTable;

pub fn render(table: &ReportTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&table.headers).map_err(render_error)?;
    for row in &table.rows {
        writer.write_record(row).map_err(render_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| CrmError::Render(format!("csv: {}", e)))
}

fn render_error(err: csv::Error) -> CrmError {
    CrmError::Render(format!("csv: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_cells_with_separators() {
        let mut table = ReportTable::new("Clients", ["Name", "Address"]);
        table.push_row(["Ana", "Calle Mayor 1, Madrid"]);
        table.push_row(["Bo \"B\"", "N/A"]);

        let text = String::from_utf8(render(&table).unwrap()).unwrap();
        assert_eq!(
            text,
            "Name,Address\nAna,\"Calle Mayor 1, Madrid\"\n\"Bo \"\"B\"\"\",N/A\n"
        );
    }

    #[test]
    fn test_reads_back_to_same_rows() {
        let mut table = ReportTable::new("Clients", ["ID", "Name"]);
        table.push_row(["1", "Lucía"]);

        let bytes = render(&table).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();

        assert_eq!(headers, table.headers);
        assert_eq!(rows, table.rows);
    }
}
