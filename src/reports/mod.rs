mod render;
pub mod table;

pub use render::render;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{CrmError, Result};
use crate::models::{Client, ClientColumn, ClientQuery, NewReport, Report, ReportFormat, ReportKind, ReportTable};

/// What a report should cover.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRequest {
    Individual { client_id: i64 },
    FullList { query: ClientQuery },
    Statistics,
    Custom { client_ids: Vec<i64>, columns: Vec<ClientColumn> },
}

impl ReportRequest {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportRequest::Individual { .. } => ReportKind::Individual,
            ReportRequest::FullList { .. } => ReportKind::FullList,
            ReportRequest::Statistics => ReportKind::Statistics,
            ReportRequest::Custom { .. } => ReportKind::Custom,
        }
    }

    pub fn full_list() -> Self {
        ReportRequest::FullList {
            query: ClientQuery::default(),
        }
    }

    fn scope(&self) -> String {
        match self {
            ReportRequest::Individual { client_id } => format!("client{}", client_id),
            ReportRequest::FullList { .. } => "all".to_string(),
            ReportRequest::Statistics => "stats".to_string(),
            ReportRequest::Custom { .. } => "custom".to_string(),
        }
    }
}

/// Builds report snapshots from the database and writes them to disk
pub struct ReportGenerator<'a> {
    db: &'a Database,
    output_dir: PathBuf,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(db: &'a Database, output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }

        Ok(Self { db, output_dir })
    }

    /// Snapshot the requested data, render it and store the report.
    ///
    /// Either the file, the report row and its snapshot all exist
    /// afterwards, or none of them do.
    pub async fn generate(&self, request: ReportRequest, format: ReportFormat) -> Result<Report> {
        let created_at = Utc::now();
        let kind = request.kind();
        let (table, client_ids, description) = self.collect(&request).await?;

        let bytes = render(&table, format, created_at)?;

        let new_report = NewReport {
            kind,
            title: table.title.clone(),
            description,
            client_ids,
            format,
            created_at,
        };

        let scope = request.scope();
        let mut written: Option<PathBuf> = None;
        let stored = self
            .db
            .insert_report_with_snapshot(&new_report, &table, |report_id| {
                let name = format!(
                    "{}_{}_r{}_{}.{}",
                    kind,
                    scope,
                    report_id,
                    timestamp(created_at),
                    format.extension()
                );
                let path = self.output_dir.join(name);
                write_new_file(&path, &bytes)?;
                let stored_path = path.to_string_lossy().into_owned();
                written = Some(path);
                Ok(stored_path)
            })
            .await;

        match stored {
            Ok(report) => {
                info!(report_id = report.id, path = %report.file_path, "report generated");
                Ok(report)
            }
            Err(err) => {
                if let Some(path) = written {
                    discard(&path);
                }
                warn!(kind = %kind, error = %err, "report generation failed");
                Err(err)
            }
        }
    }

    /// Render an existing report's snapshot into another file. Live client
    /// data is never consulted.
    pub async fn export(&self, report_id: i64, format: ReportFormat) -> Result<PathBuf> {
        let report = self.db.get_report(report_id).await?;
        let snapshot = self.db.get_report_data(report_id).await?;

        let bytes = render(&snapshot.table, format, snapshot.created_at)?;

        let stem = format!(
            "{}_r{}_export_{}",
            report.kind,
            report.id,
            timestamp(Utc::now())
        );
        let path = self.unused_path(&stem, format);
        write_new_file(&path, &bytes)?;

        info!(report_id, format = %format, path = %path.display(), "report exported");
        Ok(path)
    }

    async fn collect(&self, request: &ReportRequest) -> Result<(ReportTable, Vec<i64>, Option<String>)> {
        match request {
            ReportRequest::Individual { client_id } => {
                let client = self.require_client(*client_id).await?;
                Ok((table::individual(&client), vec![client.id], None))
            }
            ReportRequest::FullList { query } => {
                let clients = self.db.list_clients(query).await?;
                let ids = clients.iter().map(|c| c.id).collect();
                let description = query
                    .search
                    .as_ref()
                    .map(|term| format!("Clients matching '{}'", term));
                let table = table::client_list("Client list", &clients, &ClientColumn::ALL);
                Ok((table, ids, description))
            }
            ReportRequest::Statistics => {
                let client_stats = self.db.client_stats().await?;
                let report_stats = self.db.report_stats().await?;
                Ok((table::statistics(&client_stats, &report_stats), Vec::new(), None))
            }
            ReportRequest::Custom { client_ids, columns } => {
                if client_ids.is_empty() {
                    return Err(CrmError::Validation(
                        "a custom report needs at least one client".into(),
                    ));
                }

                let mut clients = Vec::with_capacity(client_ids.len());
                for id in client_ids {
                    clients.push(self.require_client(*id).await?);
                }

                let columns: &[ClientColumn] = if columns.is_empty() {
                    &ClientColumn::ALL
                } else {
                    columns
                };
                let description = format!("Custom selection of {} clients", clients.len());
                let table = table::client_list("Custom client report", &clients, columns);
                Ok((table, client_ids.clone(), Some(description)))
            }
        }
    }

    async fn require_client(&self, id: i64) -> Result<Client> {
        match self.db.get_client(id).await {
            Err(err) if err.is_not_found() => {
                Err(CrmError::MissingData(format!("client {} does not exist", id)))
            }
            other => other,
        }
    }

    fn unused_path(&self, stem: &str, format: ReportFormat) -> PathBuf {
        let ext = format.extension();
        let mut path = self.output_dir.join(format!("{}.{}", stem, ext));
        let mut n = 1;
        while path.exists() {
            path = self.output_dir.join(format!("{}_{}.{}", stem, n, ext));
            n += 1;
        }
        path
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Write `bytes` to a file that must not exist yet. A partial file is removed.
fn write_new_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| CrmError::Render(format!("cannot create {}: {}", path.display(), e)))?;

    if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
        drop(file);
        discard(path);
        return Err(CrmError::Render(format!("cannot write {}: {}", path.display(), e)));
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove partial report file");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::db::test_support::open_temp_db;
    use crate::models::{ClientDraft, ReportQuery};

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }

    async fn client(db: &Database, name: &str) -> Client {
        let mut draft = ClientDraft::new(name, format!("{}@example.com", name.to_lowercase()));
        draft.country = Some("Spain".into());
        db.create_client(&draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_generate_individual_report() {
        let (dir, db) = open_temp_db().await;
        let ana = client(&db, "Ana").await;
        let generator = ReportGenerator::new(&db, dir.path().join("reports")).unwrap();

        let report = generator
            .generate(ReportRequest::Individual { client_id: ana.id }, ReportFormat::Csv)
            .await
            .unwrap();

        assert_eq!(report.kind, ReportKind::Individual);
        assert_eq!(report.client_ids, vec![ana.id]);
        let path = PathBuf::from(&report.file_path);
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("individual_client{}_r{}_", ana.id, report.id)));
        assert!(name.ends_with(".csv"));

        let snapshot = db.get_report_data(report.id).await.unwrap();
        assert_eq!(snapshot.table, table::individual(&ana));
        let written = fs::read(&path).unwrap();
        assert_eq!(written, render(&snapshot.table, ReportFormat::Csv, snapshot.created_at).unwrap());
    }

    #[tokio::test]
    async fn test_missing_client_writes_nothing() {
        let (dir, db) = open_temp_db().await;
        let out = dir.path().join("reports");
        let generator = ReportGenerator::new(&db, &out).unwrap();

        let err = generator
            .generate(ReportRequest::Individual { client_id: 404 }, ReportFormat::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::MissingData(_)));

        let custom = ReportRequest::Custom {
            client_ids: vec![client(&db, "Ana").await.id, 405],
            columns: vec![],
        };
        let err = generator.generate(custom, ReportFormat::Xlsx).await.unwrap_err();
        assert!(matches!(err, CrmError::MissingData(_)));

        assert!(files_in(&out).is_empty());
        assert!(db.list_reports(&ReportQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_leaves_no_report() {
        let (dir, db) = open_temp_db().await;
        let out = dir.path().join("reports");
        let generator = ReportGenerator::new(&db, &out).unwrap();
        client(&db, "Ana").await;

        // Replace the output directory with a plain file so creation fails
        fs::remove_dir(&out).unwrap();
        fs::write(&out, b"not a directory").unwrap();

        let err = generator
            .generate(ReportRequest::full_list(), ReportFormat::Csv)
            .await
            .unwrap_err();

        assert!(matches!(err, CrmError::Render(_)));
        assert!(db.list_reports(&ReportQuery::default()).await.unwrap().is_empty());
        assert!(db.list_report_data().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_client_keeps_historical_report() {
        let (dir, db) = open_temp_db().await;
        let ana = client(&db, "Ana").await;
        let generator = ReportGenerator::new(&db, dir.path().join("reports")).unwrap();

        let report = generator
            .generate(ReportRequest::Individual { client_id: ana.id }, ReportFormat::Pdf)
            .await
            .unwrap();
        db.delete_client(ana.id).await.unwrap();

        let kept = db.get_report(report.id).await.unwrap();
        assert_eq!(kept, report);
        let snapshot = db.get_report_data(report.id).await.unwrap();
        assert_eq!(snapshot.table.title, "Client report: Ana");

        let exported = generator.export(report.id, ReportFormat::Csv).await.unwrap();
        assert!(exported.exists());
    }

    #[tokio::test]
    async fn test_export_formats_share_snapshot() {
        let (dir, db) = open_temp_db().await;
        let out = dir.path().join("reports");
        client(&db, "Ana").await;
        let bea = client(&db, "Bea").await;
        let generator = ReportGenerator::new(&db, &out).unwrap();

        let report = generator
            .generate(ReportRequest::full_list(), ReportFormat::Pdf)
            .await
            .unwrap();

        // Later edits must not leak into exports of the historical report
        let mut renamed = ClientDraft::from(&bea);
        renamed.name = "Beatriz".into();
        db.update_client(bea.id, &renamed).await.unwrap();

        let pdf = generator.export(report.id, ReportFormat::Pdf).await.unwrap();
        let xlsx = generator.export(report.id, ReportFormat::Xlsx).await.unwrap();
        let csv_path = generator.export(report.id, ReportFormat::Csv).await.unwrap();

        assert_ne!(pdf, PathBuf::from(&report.file_path));
        assert_eq!(pdf.extension().unwrap(), "pdf");
        assert_eq!(xlsx.extension().unwrap(), "xlsx");
        assert_eq!(csv_path.extension().unwrap(), "csv");
        assert!(fs::read(&pdf).unwrap().starts_with(b"%PDF"));
        assert!(fs::read(&xlsx).unwrap().starts_with(b"PK"));

        let snapshot = db.get_report_data(report.id).await.unwrap();
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows, snapshot.table.rows);
        assert!(rows.iter().any(|row| row.contains(&"Bea".to_string())));
        assert!(!rows.iter().any(|row| row.contains(&"Beatriz".to_string())));

        // The generated file plus three exports
        assert_eq!(files_in(&out).len(), 4);
    }

    #[tokio::test]
    async fn test_repeated_export_never_overwrites() {
        let (dir, db) = open_temp_db().await;
        let generator = ReportGenerator::new(&db, dir.path().join("reports")).unwrap();
        let report = generator
            .generate(ReportRequest::Statistics, ReportFormat::Csv)
            .await
            .unwrap();

        let first = generator.export(report.id, ReportFormat::Csv).await.unwrap();
        let second = generator.export(report.id, ReportFormat::Csv).await.unwrap();
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }

    #[tokio::test]
    async fn test_statistics_report_reads_live_state() {
        let (dir, db) = open_temp_db().await;
        client(&db, "Ana").await;
        client(&db, "Bea").await;
        let generator = ReportGenerator::new(&db, dir.path().join("reports")).unwrap();

        let report = generator
            .generate(ReportRequest::Statistics, ReportFormat::Xlsx)
            .await
            .unwrap();
        assert!(report.client_ids.is_empty());

        let snapshot = db.get_report_data(report.id).await.unwrap();
        assert_eq!(snapshot.table.rows[0], vec!["Total clients", "2"]);
        assert!(snapshot
            .table
            .rows
            .contains(&vec!["Clients in Spain".to_string(), "2".to_string()]));
    }

    #[tokio::test]
    async fn test_custom_report_columns_and_validation() {
        let (dir, db) = open_temp_db().await;
        let ana = client(&db, "Ana").await;
        let generator = ReportGenerator::new(&db, dir.path().join("reports")).unwrap();

        let empty = ReportRequest::Custom { client_ids: vec![], columns: vec![] };
        assert!(matches!(
            generator.generate(empty, ReportFormat::Csv).await,
            Err(CrmError::Validation(_))
        ));

        let request = ReportRequest::Custom {
            client_ids: vec![ana.id],
            columns: vec![ClientColumn::Name, ClientColumn::Email],
        };
        let report = generator.generate(request, ReportFormat::Csv).await.unwrap();
        assert_eq!(report.kind, ReportKind::Custom);
        assert_eq!(report.description.as_deref(), Some("Custom selection of 1 clients"));

        let snapshot = db.get_report_data(report.id).await.unwrap();
        assert_eq!(snapshot.table.headers, vec!["Name", "Email"]);
        assert_eq!(snapshot.table.rows, vec![vec!["Ana".to_string(), "ana@example.com".to_string()]]);
    }
}
