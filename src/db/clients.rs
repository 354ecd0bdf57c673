use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use super::Database;
use crate::error::{CrmError, Result};
use crate::models::{Client, ClientDraft, ClientQuery, ClientSort};

impl Database {
    pub async fn create_client(&self, draft: &ClientDraft) -> Result<Client> {
        draft.validate()?;
        let draft = draft.clone().normalized();
        let now = Utc::now();

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (name, email, phone, company, address, city, country, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.company)
        .bind(&draft.address)
        .bind(&draft.city)
        .bind(&draft.country)
        .bind(now)
        .bind(now)
        .fetch_one(self.get_pool())
        .await?;

        info!(client_id = client.id, name = %client.name, "client created");
        Ok(client)
    }

    pub async fn get_client(&self, id: i64) -> Result<Client> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or_else(|| CrmError::not_found("Client", id))
    }

    pub async fn client_exists(&self, id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients WHERE id = ?")
            .bind(id)
            .fetch_one(self.get_pool())
            .await?;

        Ok(found > 0)
    }

    pub async fn list_clients(&self, query: &ClientQuery) -> Result<Vec<Client>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM clients WHERE 1 = 1");

        if let Some(country) = query.country.as_deref() {
            builder.push(" AND country = ").push_bind(country.to_string());
        }

        builder.push(match query.sort {
            ClientSort::Newest => " ORDER BY created_at DESC, id DESC",
            ClientSort::Name => " ORDER BY name COLLATE NOCASE ASC, id ASC",
            ClientSort::Id => " ORDER BY id ASC",
        });

        let mut clients = builder
            .build_query_as::<Client>()
            .fetch_all(self.get_pool())
            .await?;

        // Matched in Rust: SQLite's lower() folds ASCII only
        if let Some(term) = query.search_term() {
            clients.retain(|client| client.matches_search(&term));
        }

        Ok(clients)
    }

    pub async fn update_client(&self, id: i64, draft: &ClientDraft) -> Result<Client> {
        draft.validate()?;
        let draft = draft.clone().normalized();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = ?, email = ?, phone = ?, company = ?, address = ?, city = ?, country = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.company)
        .bind(&draft.address)
        .bind(&draft.city)
        .bind(&draft.country)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or_else(|| CrmError::not_found("Client", id))?;

        info!(client_id = id, "client updated");
        Ok(client)
    }

    /// Remove a client. Reports that cover it are left untouched.
    pub async fn delete_client(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CrmError::not_found("Client", id));
        }
        info!(client_id = id, "client deleted");
        Ok(())
    }
}
