mod client;
mod report;
mod report_data;
mod stats;
mod user;

pub use client::{Client, ClientColumn, ClientDraft, ClientQuery, ClientSort};
pub use report::{NewReport, Report, ReportFormat, ReportKind, ReportQuery};
pub use report_data::{ReportData, ReportTable};
pub use stats::{ClientStats, ReportStats};
pub use user::{Principal, Role, User};
