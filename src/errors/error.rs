use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Record not found: {0} with ID {1}")]
    NotFound(String, String),

    #[error("Conflict error: {0}")]
    Conflict(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl DbError {
    /// True when the underlying store rejected a write because of a UNIQUE constraint
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            DbError::Conflict(_) => true,
            _ => false,
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DbError", 2)?;
        let (kind, message) = match self {
            DbError::Sqlx(err) => ("Sqlx", err.to_string()),
            DbError::ConnectionPool(s) => ("ConnectionPool", s.clone()),
            DbError::Transaction(s) => ("Transaction", s.clone()),
            DbError::NotFound(s1, s2) => ("NotFound", format!("Record not found: {} with ID {}", s1, s2)),
            DbError::Conflict(s) => ("Conflict", s.clone()),
            DbError::Migration(s) => ("Migration", s.clone()),
            DbError::Other(s) => ("Other", s.clone()),
        };
        state.serialize_field("type", kind)?;
        state.serialize_field("message", &message)?;
        state.end()
    }
}

/// Manual Clone implementation for DbError
impl Clone for DbError {
    fn clone(&self) -> Self {
        match self {
            // sqlx::Error is not Clone; keep the classification that matters to callers
            DbError::Sqlx(err) if self.is_unique_violation() => DbError::Conflict(err.to_string()),
            DbError::Sqlx(err) => DbError::Other(format!("SQLx error: {}", err)),
            DbError::ConnectionPool(s) => DbError::ConnectionPool(s.clone()),
            DbError::Transaction(s) => DbError::Transaction(s.clone()),
            DbError::NotFound(s1, s2) => DbError::NotFound(s1.clone(), s2.clone()),
            DbError::Conflict(s) => DbError::Conflict(s.clone()),
            DbError::Migration(s) => DbError::Migration(s.clone()),
            DbError::Other(s) => DbError::Other(s.clone()),
        }
    }
}

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Entity not found: {0} with ID {1}")]
    EntityNotFound(String, i64),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DomainError {
    fn from(error: sqlx::Error) -> Self {
        DomainError::Database(DbError::from(error))
    }
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        ServiceError::Domain(DomainError::Validation(error))
    }
}

impl From<DbError> for ServiceError {
    fn from(error: DbError) -> Self {
        ServiceError::Domain(DomainError::Database(error))
    }
}

/// Coarse classification handed to the request layer, which maps it onto status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Storage,
    PermissionDenied,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict_error",
            ErrorKind::Storage => "storage_error",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound(_, _) => ErrorKind::NotFound,
            _ if self.is_unique_violation() => ErrorKind::Conflict,
            _ => ErrorKind::Storage,
        }
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Database(db) => db.kind(),
            DomainError::EntityNotFound(_, _) => ErrorKind::NotFound,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Domain(domain) => domain.kind(),
            ServiceError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ServiceError::Configuration(_) => ErrorKind::Internal,
        }
    }

    /// Collapse into the single kind + message failure reported to callers
    pub fn to_structured(&self) -> StructuredError {
        StructuredError {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// The one failure a caller sees for a rejected operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StructuredError {
    /// JSON body for the request layer: `{"kind": ..., "message": ...}`
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"kind":"{:?}","message":"unserializable error"}}"#, self.kind)
        })
    }
}

impl From<&ServiceError> for StructuredError {
    fn from(error: &ServiceError) -> Self {
        error.to_structured()
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' must be at least {min} characters")]
    MinLength {
        field: String,
        min: usize,
    },

    #[error("Field '{field}' cannot exceed {max} characters")]
    MaxLength {
        field: String,
        max: usize,
    },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' must be unique")]
    Unique {
        field: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },

    #[error("Entity is invalid: {0}")]
    Entity(String),

    #[error("Relationship error: {0}")]
    Relationship(String),

    #[error("Validation error: {0}")]
    Custom(String),
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn min_length(field: &str, min: usize) -> Self {
        Self::MinLength {
            field: field.to_string(),
            min,
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Self::MaxLength {
            field: field.to_string(),
            max,
        }
    }

    pub fn range<T: fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unique(field: &str) -> Self {
        Self::Unique {
            field: field.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn relationship(message: &str) -> Self {
        Self::Relationship(message.to_string())
    }

    pub fn custom(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}
