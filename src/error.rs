//! Error types for database operations
//!
//! SQLite enforces the schema's constraints; this module sorts the engine's
//! failures into the categories callers act on.

use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Message prefix raised by the condition-subtype exclusivity triggers
pub const STIMULUS_CONFLICT_PREFIX: &str = "stimulus conflict";

/// Message prefix raised by the update-blocking triggers
pub const APPEND_ONLY_PREFIX: &str = "append-only";

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Referential integrity violated: {0}")]
    ForeignKey(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Condition already has a stimulus: {0}")]
    StimulusConflict(String),

    #[error("Table is append-only: {0}")]
    AppendOnly(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query error: {0}")]
    Query(DieselError),
}

impl DbError {
    /// True when a parent row was missing (or a referenced row is still in use)
    pub fn is_referential_integrity(&self) -> bool {
        matches!(self, DbError::ForeignKey(_))
    }
}

impl From<DieselError> for DbError {
    fn from(e: DieselError) -> Self {
        let (kind, info) = match e {
            DieselError::DatabaseError(kind, info) => (kind, info),
            other => return DbError::Query(other),
        };

        let message = info.message().to_string();
        if message.starts_with(STIMULUS_CONFLICT_PREFIX) {
            return DbError::StimulusConflict(message);
        }
        if message.starts_with(APPEND_ONLY_PREFIX) {
            return DbError::AppendOnly(message);
        }

        match kind {
            DatabaseErrorKind::ForeignKeyViolation => DbError::ForeignKey(message),
            DatabaseErrorKind::UniqueViolation => DbError::Duplicate(message),
            DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                DbError::Constraint(message)
            }
            // Older SQLite builds report constraint failures without an extended code
            _ if message.starts_with("FOREIGN KEY constraint failed") => DbError::ForeignKey(message),
            _ if message.starts_with("UNIQUE constraint failed") => DbError::Duplicate(message),
            _ if message.starts_with("CHECK constraint failed") => DbError::Constraint(message),
            _ => DbError::Query(DieselError::DatabaseError(kind, info)),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
