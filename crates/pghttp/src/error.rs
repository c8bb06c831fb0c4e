//! Error types for pghttp

use thiserror::Error;

/// Result type alias for pghttp operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Missing or unusable configuration (e.g. no `DATABASE_URL`)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection error (bad connection string, unexpected HTTP response)
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by the database server
    #[error("Database error{}: {message}", sqlstate_suffix(.code))]
    Database {
        code: Option<String>,
        message: String,
        constraint: Option<String>,
        detail: Option<String>,
    },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// More rows returned than expected
    #[error("Too many rows: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Unique constraint violation (SQLSTATE 23505)
    #[error("Unique constraint violation: {}{message}", constraint_prefix(.constraint))]
    UniqueViolation {
        message: String,
        constraint: Option<String>,
        detail: Option<String>,
    },

    /// Foreign key constraint violation (SQLSTATE 23503)
    #[error("Foreign key violation: {}{message}", constraint_prefix(.constraint))]
    ForeignKeyViolation {
        message: String,
        constraint: Option<String>,
        detail: Option<String>,
    },

    /// Check constraint violation (SQLSTATE 23514)
    #[error("Check constraint violation: {}{message}", constraint_prefix(.constraint))]
    CheckViolation {
        message: String,
        constraint: Option<String>,
        detail: Option<String>,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

fn sqlstate_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

fn constraint_prefix(constraint: &Option<String>) -> String {
    constraint.as_deref().map(|c| format!("{c}: ")).unwrap_or_default()
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a too-many-rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, Self::ForeignKeyViolation { .. })
    }

    /// Check if this is a check constraint violation error
    pub fn is_check_violation(&self) -> bool {
        matches!(self, Self::CheckViolation { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// SQLSTATE code reported by the server, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => code.as_deref(),
            Self::UniqueViolation { .. } => Some("23505"),
            Self::ForeignKeyViolation { .. } => Some("23503"),
            Self::CheckViolation { .. } => Some("23514"),
            _ => None,
        }
    }

    /// Name of the violated constraint, if the server reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Database { constraint, .. }
            | Self::UniqueViolation { constraint, .. }
            | Self::ForeignKeyViolation { constraint, .. }
            | Self::CheckViolation { constraint, .. } => constraint.as_deref(),
            _ => None,
        }
    }

    /// Server-provided detail line, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Database { detail, .. }
            | Self::UniqueViolation { detail, .. }
            | Self::ForeignKeyViolation { detail, .. }
            | Self::CheckViolation { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Build an error from a server-reported failure, specialising constraint violations.
    pub fn from_db_error(
        code: Option<String>,
        message: String,
        constraint: Option<String>,
        detail: Option<String>,
    ) -> Self {
        match code.as_deref() {
            Some("23505") => Self::UniqueViolation {
                message,
                constraint,
                detail,
            },
            Some("23503") => Self::ForeignKeyViolation {
                message,
                constraint,
                detail,
            },
            Some("23514") => Self::CheckViolation {
                message,
                constraint,
                detail,
            },
            _ => Self::Database {
                code,
                message,
                constraint,
                detail,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_specialised() {
        let err = OrmError::from_db_error(
            Some("23505".to_string()),
            "duplicate key value".to_string(),
            Some("users_email_key".to_string()),
            None,
        );
        assert!(err.is_unique_violation());
        assert_eq!(
            err.to_string(),
            "Unique constraint violation: users_email_key: duplicate key value"
        );
    }

    #[test]
    fn constraint_violations_keep_code_and_fields() {
        let err = OrmError::from_db_error(
            Some("23505".to_string()),
            "duplicate key value".to_string(),
            Some("users_email_key".to_string()),
            Some("Key (email)=(a@b.c) already exists.".to_string()),
        );
        assert_eq!(err.sqlstate(), Some("23505"));
        assert_eq!(err.constraint(), Some("users_email_key"));
        assert_eq!(err.detail(), Some("Key (email)=(a@b.c) already exists."));

        let err = OrmError::from_db_error(
            Some("23503".to_string()),
            "insert violates foreign key".to_string(),
            Some("orders_user_id_fkey".to_string()),
            None,
        );
        assert!(err.is_foreign_key_violation());
        assert_eq!(err.sqlstate(), Some("23503"));
        assert_eq!(err.constraint(), Some("orders_user_id_fkey"));

        let err = OrmError::from_db_error(
            Some("23514".to_string()),
            "new row violates check constraint".to_string(),
            None,
            None,
        );
        assert!(err.is_check_violation());
        assert_eq!(err.sqlstate(), Some("23514"));
        assert_eq!(err.constraint(), None);
        assert_eq!(
            err.to_string(),
            "Check constraint violation: new row violates check constraint"
        );
    }

    #[test]
    fn unknown_code_keeps_server_fields() {
        let err = OrmError::from_db_error(
            Some("42P01".to_string()),
            "relation \"nope\" does not exist".to_string(),
            None,
            None,
        );
        assert_eq!(err.sqlstate(), Some("42P01"));
        assert_eq!(
            err.to_string(),
            "Database error [42P01]: relation \"nope\" does not exist"
        );
    }

    #[test]
    fn database_error_without_code() {
        let err = OrmError::from_db_error(None, "boom".to_string(), None, None);
        assert_eq!(err.to_string(), "Database error: boom");
    }
}
