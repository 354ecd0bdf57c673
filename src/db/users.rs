use chrono::Utc;
use tracing::info;

use super::Database;
use crate::error::{CrmError, Result};
use crate::models::User;

impl Database {
    pub async fn create_user(&self, username: &str, password_hash: &str, is_admin: bool) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, is_admin, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .bind(Utc::now())
        .fetch_one(self.get_pool())
        .await?;

        info!(user_id = user.id, username = %user.username, is_admin, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or_else(|| CrmError::not_found("User", id))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.get_pool())
            .await?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username ASC")
            .fetch_all(self.get_pool())
            .await?;

        Ok(users)
    }

    pub async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.get_pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CrmError::not_found("User", id));
        }
        info!(user_id = id, "password changed");
        Ok(())
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CrmError::not_found("User", id));
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.get_pool())
            .await?;

        Ok(count)
    }
}
