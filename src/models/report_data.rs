use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tabular content of a report, rendered identically by every format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new<S: Into<String>>(title: impl Into<String>, headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            title: title.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// Snapshot captured when a report is generated. Never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportData {
    pub id: i64,
    pub report_id: i64,
    pub table: ReportTable,
    pub created_at: DateTime<Utc>,
}
