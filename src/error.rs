use thiserror::Error;

/// Errors surfaced by the persistence, authentication and report layers.
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid username or password")]
    Unauthorized,

    #[error("Missing data for report: {0}")]
    MissingData(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(sqlx::Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not render report: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not hash password: {0}")]
    Hashing(String),
}

pub type Result<T> = std::result::Result<T, CrmError>;

impl CrmError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for CrmError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_string());
            }
        }
        Self::Storage(err)
    }
}

impl From<argon2::password_hash::Error> for CrmError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hashing(err.to_string())
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(sqlx::Error::Decode(Box::new(err)))
    }
}
