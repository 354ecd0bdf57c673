use crate::models::{Client, ClientColumn, ClientStats, ReportStats, ReportTable};

const FIELD_HEADERS: [&str; 2] = ["Field", "Value"];
const METRIC_HEADERS: [&str; 2] = ["Metric", "Value"];

/// Field/value listing of a single client
pub fn individual(client: &Client) -> ReportTable {
    let mut table = ReportTable::new(format!("Client report: {}", client.name), FIELD_HEADERS);

    for column in ClientColumn::ALL {
        table.push_row([column.header().to_string(), column.value(client)]);
    }
    table.push_row([
        "Last updated".to_string(),
        client.updated_at.format("%Y-%m-%d %H:%M").to_string(),
    ]);

    table
}

/// One row per client with the chosen columns
pub fn client_list(title: impl Into<String>, clients: &[Client], columns: &[ClientColumn]) -> ReportTable {
    let mut table = ReportTable::new(title, columns.iter().map(|c| c.header()));

    for client in clients {
        table.push_row(columns.iter().map(|c| c.value(client)));
    }

    table
}

pub fn statistics(clients: &ClientStats, reports: &ReportStats) -> ReportTable {
    let mut table = ReportTable::new("Statistics", METRIC_HEADERS);

    table.push_row(["Total clients".to_string(), clients.total_clients.to_string()]);
    for (country, count) in &clients.by_country {
        table.push_row([format!("Clients in {}", country), count.to_string()]);
    }
    for (city, count) in &clients.by_city {
        table.push_row([format!("Clients in city {}", city), count.to_string()]);
    }

    table.push_row(["Total reports".to_string(), reports.total_reports.to_string()]);
    for (kind, count) in &reports.by_kind {
        table.push_row([format!("Reports of kind {}", kind), count.to_string()]);
    }
    for (format, count) in &reports.by_format {
        table.push_row([format!("Reports in {} format", format), count.to_string()]);
    }

    table
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn client() -> Client {
        let now = Utc::now();
        Client {
            id: 3,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            company: Some("Acme".into()),
            address: None,
            city: None,
            country: Some("Spain".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_individual_lists_every_field() {
        let table = individual(&client());

        assert_eq!(table.title, "Client report: Ana");
        assert_eq!(table.headers, vec!["Field", "Value"]);
        assert_eq!(table.rows.len(), ClientColumn::ALL.len() + 1);
        assert_eq!(table.rows[0], vec!["ID", "3"]);
        assert!(table.rows.contains(&vec!["Phone".to_string(), "N/A".to_string()]));
    }

    #[test]
    fn test_client_list_uses_selected_columns() {
        let table = client_list(
            "Selection",
            &[client()],
            &[ClientColumn::Name, ClientColumn::Company],
        );

        assert_eq!(table.headers, vec!["Name", "Company"]);
        assert_eq!(table.rows, vec![vec!["Ana".to_string(), "Acme".to_string()]]);
    }

    #[test]
    fn test_statistics_rows() {
        let clients = ClientStats {
            total_clients: 2,
            by_country: vec![("Spain".into(), 2)],
            by_city: vec![],
        };
        let reports = ReportStats {
            total_reports: 1,
            by_kind: vec![("individual".into(), 1)],
            by_format: vec![("pdf".into(), 1)],
        };

        let table = statistics(&clients, &reports);
        assert_eq!(table.rows[0], vec!["Total clients", "2"]);
        assert_eq!(table.rows[1], vec!["Clients in Spain", "2"]);
        assert_eq!(table.rows.len(), 5);
    }
}
