use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CrmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Individual,
    FullList,
    Statistics,
    Custom,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Individual,
        ReportKind::FullList,
        ReportKind::Statistics,
        ReportKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Individual => "individual",
            ReportKind::FullList => "full_list",
            ReportKind::Statistics => "statistics",
            ReportKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CrmError::Validation(format!("unknown report kind '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportFormat {
    Pdf,
    Xlsx,
    Csv,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Pdf, ReportFormat::Xlsx, ReportFormat::Csv];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Csv => "csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "xlsx" | "excel" => Ok(ReportFormat::Xlsx),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(CrmError::Validation(format!("unknown report format '{}'", other))),
        }
    }
}

/// A generated report. Only `title` and `description` may change after
/// generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: i64,
    pub kind: ReportKind,
    pub title: String,
    pub description: Option<String>,
    pub client_ids: Vec<i64>,
    pub format: ReportFormat,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn covers_client(&self, client_id: i64) -> bool {
        self.client_ids.contains(&client_id)
    }
}

/// Everything about a report that is known before it is written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub kind: ReportKind,
    pub title: String,
    pub description: Option<String>,
    pub client_ids: Vec<i64>,
    pub format: ReportFormat,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing reports, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportQuery {
    pub kind: Option<ReportKind>,
    pub client_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_parse_back() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
        assert!("weekly".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_format_accepts_excel_alias() {
        assert_eq!("Excel".parse::<ReportFormat>().unwrap(), ReportFormat::Xlsx);
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert!("docx".parse::<ReportFormat>().is_err());
    }
}
