//! Error types for tydb

use crate::validate::ValidationErrors;
use thiserror::Error;

/// Result type alias for tydb operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Execution failure reported by the executor, optionally carrying the SQL that failed.
    #[error("{}", fmt_core(.message, .sql.as_deref()))]
    Core {
        message: String,
        sql: Option<String>,
    },

    /// Schema misconfiguration (primary key, duplicate names, unresolved associations)
    #[error("Definition error: {0}")]
    Definition(String),

    /// Field validation failed before any mutating SQL was built
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Row not found by a find-or-fail read
    #[error("Not found: no '{entity}' row matched (primary key '{primary_key}', filter {filter})")]
    NotFound {
        entity: String,
        primary_key: String,
        filter: serde_json::Value,
    },

    /// Malformed query description (filter, identifiers, DDL, unsafe DML)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Typed extraction from an entity field failed
    #[error("Decode error on field '{field}': {message}")]
    Decode { field: String, message: String },
}

fn fmt_core(message: &str, sql: Option<&str>) -> String {
    match sql {
        Some(sql) => format!("Query error: {message} (sql: {sql})"),
        None => format!("Query error: {message}"),
    }
}

impl OrmError {
    /// Create an execution error without SQL attached.
    pub fn core(message: impl Into<String>) -> Self {
        Self::Core {
            message: message.into(),
            sql: None,
        }
    }

    /// Create a definition error
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    /// Create an invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Create a decode error for a specific field
    pub fn decode(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attach the offending SQL to an execution error that does not carry one yet.
    ///
    /// Other variants are returned unchanged.
    pub fn with_sql(self, statement: &str) -> Self {
        match self {
            Self::Core { message, sql: None } => Self::Core {
                message,
                sql: Some(statement.to_string()),
            },
            other => other,
        }
    }

    /// The SQL attached to an execution error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Core { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }

    /// Field → reason mapping of a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a definition error
    pub fn is_definition(&self) -> bool {
        matches!(self, Self::Definition(_))
    }
}
