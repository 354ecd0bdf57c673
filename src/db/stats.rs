use super::Database;
use crate::error::Result;
use crate::models::{ClientStats, ReportStats};

impl Database {
    pub async fn client_stats(&self) -> Result<ClientStats> {
        let total_clients = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(self.get_pool())
            .await?;

        let by_country = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT country, COUNT(*) AS count
            FROM clients
            WHERE country IS NOT NULL
            GROUP BY country
            ORDER BY count DESC, country ASC
            "#,
        )
        .fetch_all(self.get_pool())
        .await?;

        let by_city = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT city, COUNT(*) AS count
            FROM clients
            WHERE city IS NOT NULL
            GROUP BY city
            ORDER BY count DESC, city ASC
            LIMIT 10
            "#,
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(ClientStats {
            total_clients,
            by_country,
            by_city,
        })
    }

    pub async fn report_stats(&self) -> Result<ReportStats> {
        let total_reports = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports")
            .fetch_one(self.get_pool())
            .await?;

        let by_kind = sqlx::query_as::<_, (String, i64)>(
            "SELECT kind, COUNT(*) AS count FROM reports GROUP BY kind ORDER BY count DESC, kind ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        let by_format = sqlx::query_as::<_, (String, i64)>(
            "SELECT format, COUNT(*) AS count FROM reports GROUP BY format ORDER BY count DESC, format ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(ReportStats {
            total_reports,
            by_kind,
            by_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::open_temp_db;
    use crate::models::ClientDraft;

    fn located(name: &str, city: &str, country: &str) -> ClientDraft {
        let mut draft = ClientDraft::new(name, format!("{}@example.com", name.to_lowercase()));
        draft.city = Some(city.into());
        draft.country = Some(country.into());
        draft
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let (_dir, db) = open_temp_db().await;

        let clients = db.client_stats().await.unwrap();
        let reports = db.report_stats().await.unwrap();
        assert_eq!(clients.total_clients, 0);
        assert!(clients.by_country.is_empty());
        assert_eq!(reports.total_reports, 0);
    }

    #[tokio::test]
    async fn test_stats_follow_live_data() {
        let (_dir, db) = open_temp_db().await;

        db.create_client(&located("Ana", "Madrid", "Spain")).await.unwrap();
        db.create_client(&located("Bea", "Sevilla", "Spain")).await.unwrap();
        let carl = db.create_client(&located("Carl", "Lyon", "France")).await.unwrap();
        db.create_client(&ClientDraft::new("Dan", "dan@example.com")).await.unwrap();

        let stats = db.client_stats().await.unwrap();
        assert_eq!(stats.total_clients, 4);
        assert_eq!(
            stats.by_country,
            vec![("Spain".to_string(), 2), ("France".to_string(), 1)]
        );
        assert_eq!(stats.by_city.len(), 3);

        db.delete_client(carl.id).await.unwrap();
        let stats = db.client_stats().await.unwrap();
        assert_eq!(stats.total_clients, 3);
        assert_eq!(stats.by_country, vec![("Spain".to_string(), 2)]);
    }
}
