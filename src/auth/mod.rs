mod password;

pub use password::Hasher;

use tracing::{info, warn};

use crate::db::Database;
use crate::error::{CrmError, Result};
use crate::models::{Principal, Role, User};

/// Credential checks against the users table.
pub struct AuthService<'a> {
    db: &'a Database,
    hasher: Hasher,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_hasher(db, Hasher::default())
    }

    pub fn with_hasher(db: &'a Database, hasher: Hasher) -> Self {
        Self { db, hasher }
    }

    /// True while no user exists. The shell must run [`bootstrap`] first.
    ///
    /// [`bootstrap`]: AuthService::bootstrap
    pub async fn needs_bootstrap(&self) -> Result<bool> {
        Ok(self.db.count_users().await? == 0)
    }

    /// Create the first administrator. Fails once any user exists.
    pub async fn bootstrap(&self, username: &str, password: &str) -> Result<Principal> {
        if !self.needs_bootstrap().await? {
            return Err(CrmError::Conflict(
                "an administrator has already been set up".into(),
            ));
        }

        let user = self.create_user(username, password, Role::Admin).await?;
        info!(username = %user.username, "initial administrator created");
        Ok(Principal::from(&user))
    }

    /// Self-service registration of a standard user
    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        self.create_user(username, password, Role::Standard).await
    }

    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let username = username.trim();
        validate_credentials(username, password)?;

        let hash = self.hasher.hash(password)?;
        match self.db.create_user(username, &hash, role.is_admin()).await {
            Err(CrmError::Conflict(_)) => Err(CrmError::Conflict(format!(
                "username '{}' is already taken",
                username
            ))),
            other => other,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Principal> {
        let user = self.db.get_user_by_username(username.trim()).await?;

        match user {
            Some(user) if self.hasher.verify(password, &user.password_hash) => {
                info!(user_id = user.id, "login succeeded");
                Ok(Principal::from(&user))
            }
            _ => {
                warn!(username = %username.trim(), "login failed");
                Err(CrmError::Unauthorized)
            }
        }
    }

    pub async fn change_password(
        &self,
        principal: &Principal,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.db.get_user(principal.user_id).await?;
        if !self.hasher.verify(old_password, &user.password_hash) {
            return Err(CrmError::Unauthorized);
        }
        validate_credentials(&user.username, new_password)?;

        let hash = self.hasher.hash(new_password)?;
        self.db.update_password_hash(user.id, &hash).await
    }
}

fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.is_empty() {
        return Err(CrmError::Validation("username is required".into()));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(CrmError::Validation("username cannot contain spaces".into()));
    }
    if password.is_empty() {
        return Err(CrmError::Validation("password is required".into()));
    }
    Ok(())
}
