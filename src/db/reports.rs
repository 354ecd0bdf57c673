use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use super::Database;
use crate::error::{CrmError, Result};
use crate::models::{NewReport, Report, ReportData, ReportQuery, ReportTable};

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: i64,
    kind: String,
    title: String,
    description: Option<String>,
    client_ids: String,
    format: String,
    file_path: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = CrmError;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(Report {
            id: row.id,
            kind: row.kind.parse()?,
            title: row.title,
            description: row.description,
            client_ids: decode_ids(&row.client_ids)?,
            format: row.format.parse()?,
            file_path: row.file_path,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReportDataRow {
    id: i64,
    report_id: i64,
    payload: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportDataRow> for ReportData {
    type Error = CrmError;

    fn try_from(row: ReportDataRow) -> Result<Self> {
        Ok(ReportData {
            id: row.id,
            report_id: row.report_id,
            table: serde_json::from_str(&row.payload)?,
            created_at: row.created_at,
        })
    }
}

// Stored as ",1,2," so a single id can be matched with LIKE '%,1,%'
fn encode_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return String::new();
    }
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!(",{},", joined.join(","))
}

fn decode_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|e| CrmError::Storage(sqlx::Error::Decode(Box::new(e))))
        })
        .collect()
}

impl Database {
    /// Store a report and its snapshot in one transaction.
    ///
    /// `write_file` receives the new report id, writes the rendered output
    /// and returns its path. If it fails, or anything after it fails, the
    /// transaction is rolled back and no report row remains.
    pub async fn insert_report_with_snapshot<F>(
        &self,
        report: &NewReport,
        table: &ReportTable,
        write_file: F,
    ) -> Result<Report>
    where
        F: FnOnce(i64) -> Result<String>,
    {
        let payload = serde_json::to_string(table)?;
        let client_ids = encode_ids(&report.client_ids);

        let mut tx = self.get_pool().begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO reports (kind, title, description, client_ids, format, file_path, created_at)
            VALUES (?, ?, ?, ?, ?, '', ?)
            RETURNING id
            "#,
        )
        .bind(report.kind.as_str())
        .bind(&report.title)
        .bind(&report.description)
        .bind(&client_ids)
        .bind(report.format.as_str())
        .bind(report.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let file_path = write_file(id)?;

        sqlx::query("UPDATE reports SET file_path = ? WHERE id = ?")
            .bind(&file_path)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO report_data (report_id, payload, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&payload)
            .bind(report.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(report_id = id, kind = %report.kind, format = %report.format, path = %file_path, "report stored");
        Ok(Report {
            id,
            kind: report.kind,
            title: report.title.clone(),
            description: report.description.clone(),
            client_ids: report.client_ids.clone(),
            format: report.format,
            file_path,
            created_at: report.created_at,
        })
    }

    pub async fn get_report(&self, id: i64) -> Result<Report> {
        sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or_else(|| CrmError::not_found("Report", id))?
            .try_into()
    }

    pub async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM reports WHERE 1 = 1");

        if let Some(kind) = query.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(client_id) = query.client_id {
            builder
                .push(" AND client_ids LIKE ")
                .push_bind(format!("%,{},%", client_id));
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        builder
            .build_query_as::<ReportRow>()
            .fetch_all(self.get_pool())
            .await?
            .into_iter()
            .map(Report::try_from)
            .collect()
    }

    /// Change the descriptive metadata of a report. The snapshot, format,
    /// file and covered clients never change.
    pub async fn update_report_details(
        &self,
        id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Report> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CrmError::Validation("report title is required".into()));
        }

        let result = sqlx::query("UPDATE reports SET title = ?, description = ? WHERE id = ?")
            .bind(title)
            .bind(description)
            .bind(id)
            .execute(self.get_pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CrmError::not_found("Report", id));
        }
        debug!(report_id = id, "report details updated");
        self.get_report(id).await
    }

    /// Delete a report together with its snapshot. The rendered file is kept.
    pub async fn delete_report(&self, id: i64) -> Result<()> {
        let mut tx = self.get_pool().begin().await?;

        sqlx::query("DELETE FROM report_data WHERE report_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CrmError::not_found("Report", id));
        }

        tx.commit().await?;
        info!(report_id = id, "report deleted");
        Ok(())
    }

    /// The snapshot captured when the report was generated
    pub async fn get_report_data(&self, report_id: i64) -> Result<ReportData> {
        sqlx::query_as::<_, ReportDataRow>("SELECT * FROM report_data WHERE report_id = ?")
            .bind(report_id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or_else(|| CrmError::not_found("Report data for report", report_id))?
            .try_into()
    }

    pub async fn get_report_data_by_id(&self, id: i64) -> Result<ReportData> {
        sqlx::query_as::<_, ReportDataRow>("SELECT * FROM report_data WHERE id = ?")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or_else(|| CrmError::not_found("Report data", id))?
            .try_into()
    }

    pub async fn list_report_data(&self) -> Result<Vec<ReportData>> {
        sqlx::query_as::<_, ReportDataRow>("SELECT * FROM report_data ORDER BY id ASC")
            .fetch_all(self.get_pool())
            .await?
            .into_iter()
            .map(ReportData::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{decode_ids, encode_ids};
    use crate::db::test_support::open_temp_db;
    use crate::db::Database;
    use crate::error::CrmError;
    use crate::models::{
        ClientDraft, NewReport, Report, ReportFormat, ReportKind, ReportQuery, ReportTable,
    };

    fn sample_table() -> ReportTable {
        let mut table = ReportTable::new("Client report", ["Field", "Value"]);
        table.push_row(["Name", "Ana"]);
        table
    }

    fn new_report(kind: ReportKind, client_ids: Vec<i64>) -> NewReport {
        NewReport {
            kind,
            title: "Client report".into(),
            description: None,
            client_ids,
            format: ReportFormat::Csv,
            created_at: Utc::now(),
        }
    }

    async fn store(db: &Database, kind: ReportKind, client_ids: Vec<i64>) -> Report {
        db.insert_report_with_snapshot(&new_report(kind, client_ids), &sample_table(), |id| {
            Ok(format!("reports/{}.csv", id))
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_id_encoding() {
        assert_eq!(encode_ids(&[]), "");
        assert_eq!(encode_ids(&[3, 14]), ",3,14,");
        assert_eq!(decode_ids(",3,14,").unwrap(), vec![3, 14]);
        assert!(decode_ids("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_and_snapshot_stored_together() {
        let (_dir, db) = open_temp_db().await;

        let report = store(&db, ReportKind::Individual, vec![7]).await;
        assert_eq!(report.file_path, format!("reports/{}.csv", report.id));

        let fetched = db.get_report(report.id).await.unwrap();
        assert_eq!(fetched, report);

        let data = db.get_report_data(report.id).await.unwrap();
        assert_eq!(data.table, sample_table());
        assert_eq!(db.get_report_data_by_id(data.id).await.unwrap(), data);
        assert_eq!(db.list_report_data().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_file_write_rolls_back() {
        let (_dir, db) = open_temp_db().await;

        let err = db
            .insert_report_with_snapshot(
                &new_report(ReportKind::FullList, vec![]),
                &sample_table(),
                |_| Err(CrmError::Render("disk full".into())),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CrmError::Render(_)));
        assert!(db.list_reports(&ReportQuery::default()).await.unwrap().is_empty());
        assert!(db.list_report_data().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_client_keeps_reports() {
        let (_dir, db) = open_temp_db().await;
        let client = db
            .create_client(&ClientDraft::new("Ana", "ana@example.com"))
            .await
            .unwrap();

        let report = store(&db, ReportKind::Individual, vec![client.id]).await;
        db.delete_client(client.id).await.unwrap();

        let kept = db.get_report(report.id).await.unwrap();
        assert!(kept.covers_client(client.id));
        assert_eq!(db.get_report_data(report.id).await.unwrap().table, sample_table());
    }

    #[tokio::test]
    async fn test_list_reports_filters() {
        let (_dir, db) = open_temp_db().await;

        let first = store(&db, ReportKind::Individual, vec![1]).await;
        let second = store(&db, ReportKind::Custom, vec![1, 12]).await;
        store(&db, ReportKind::Statistics, vec![]).await;

        let all = db.list_reports(&ReportQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let for_client = db
            .list_reports(&ReportQuery { client_id: Some(1), ..Default::default() })
            .await
            .unwrap();
        let ids: Vec<i64> = for_client.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let for_twelve = db
            .list_reports(&ReportQuery { client_id: Some(12), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(for_twelve.len(), 1);

        let custom = db
            .list_reports(&ReportQuery { kind: Some(ReportKind::Custom), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(custom, vec![second]);
    }

    #[tokio::test]
    async fn test_update_details_only() {
        let (_dir, db) = open_temp_db().await;
        let report = store(&db, ReportKind::FullList, vec![]).await;

        let updated = db
            .update_report_details(report.id, "Quarterly list", Some("for the board"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Quarterly list");
        assert_eq!(updated.description.as_deref(), Some("for the board"));
        assert_eq!(updated.file_path, report.file_path);
        assert_eq!(updated.created_at, report.created_at);

        let err = db.update_report_details(report.id, "  ", None).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
        assert!(db.update_report_details(999, "x", None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_report_removes_snapshot() {
        let (_dir, db) = open_temp_db().await;
        let report = store(&db, ReportKind::Statistics, vec![]).await;

        db.delete_report(report.id).await.unwrap();

        assert!(db.get_report(report.id).await.unwrap_err().is_not_found());
        assert!(db.get_report_data(report.id).await.unwrap_err().is_not_found());
        assert!(db.delete_report(report.id).await.unwrap_err().is_not_found());
    }
}
