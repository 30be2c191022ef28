//! Unified error types for the session tracker.
//!
//! Error codes:
//! - VALID_001-003: Validation errors
//! - NOT_FOUND_001: Referenced session or event is absent
//! - CONFLICT_001: Reserved, no core path raises it
//! - CODEC_001: Stored item does not decode as the expected entity
//! - DB_001-002: Store errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Missing or malformed field
    InvalidInput,
    /// VALID_002: Batch is empty or exceeds the item cap
    BatchSize,
    /// VALID_003: Event type outside the fixed enumeration
    InvalidEventType,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "VALID_001",
            Self::BatchSize => "VALID_002",
            Self::InvalidEventType => "VALID_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Database error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: A store operation failed
    StoreFailed,
    /// DB_002: A cascading delete stopped part way through
    PartialDelete,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreFailed => "DB_001",
            Self::PartialDelete => "DB_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        500
    }
}

/// Unified error type for the session tracker.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input, with the offending field.
    #[error("[{code}] {field}: {message}")]
    Validation {
        code: &'static str,
        field: String,
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Never raised today: the store has no uniqueness enforcement.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("codec error: {0}")]
    Codec(String),

    /// Store failure with code.
    #[error("[{code}] {message}")]
    Database { code: &'static str, message: String },

    /// Cascading delete removed only part of a session's partition.
    #[error("partial delete of session {session_id}: removed {deleted} of {total} items: {message}")]
    PartialDelete {
        session_id: String,
        deleted: usize,
        total: usize,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a VALID_001 error for a field.
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::validation_code(ValidationErrorCode::InvalidInput, field, msg)
    }

    /// Create a validation error with code.
    pub fn validation_code(
        code: ValidationErrorCode,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            code: code.code(),
            field: field.into(),
            message: msg.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Create a database error.
    pub fn database(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Database {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Shorthand for a DB_001 store failure.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::database(DbErrorCode::StoreFailed, msg)
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Serialization(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Codec(_) => 500,
            Self::Database { .. } => 500,
            Self::PartialDelete { .. } => DbErrorCode::PartialDelete.http_status(),
        }
    }

    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => code,
            Self::Serialization(_) => ValidationErrorCode::InvalidInput.code(),
            Self::NotFound { .. } => "NOT_FOUND_001",
            Self::Conflict(_) => "CONFLICT_001",
            Self::Codec(_) => "CODEC_001",
            Self::Database { code, .. } => code,
            Self::PartialDelete { .. } => DbErrorCode::PartialDelete.code(),
        }
    }

    /// The offending field, for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
