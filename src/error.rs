//! Error types for todolist
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, unknown id)
//! - 3: Rejected input (validation failure, malformed backup)
//! - 4: Store failure (engine could not open or write)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the todo CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const STORE_FAILED: i32 = 4;
}

/// Main error type for todolist operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{collection} record not found: {id}")]
    NotFound { collection: String, id: String },

    // Rejected input (exit code 3)
    #[error("Invalid {entity}: {}", .reasons.join("; "))]
    Validation {
        entity: &'static str,
        reasons: Vec<String>,
    },

    #[error("Malformed data: {0}")]
    Format(String),

    // Store failures (exit code 4)
    #[error("{collection} already contains a record with id {id}")]
    DuplicateKey { collection: String, id: String },

    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::NotFound { .. }
            | Error::TomlParse(_) => exit_codes::USER_ERROR,

            Error::Validation { .. } | Error::Format(_) => exit_codes::REJECTED,

            Error::DuplicateKey { .. }
            | Error::StoreUnavailable { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::STORE_FAILED,
        }
    }

    /// Structured details for machine-readable output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Validation { entity, reasons } => Some(serde_json::json!({
                "entity": entity,
                "reasons": reasons,
            })),
            Error::NotFound { collection, id } | Error::DuplicateKey { collection, id } => {
                Some(serde_json::json!({
                    "collection": collection,
                    "id": id,
                }))
            }
            Error::InvalidConfig(message)
            | Error::InvalidArgument(message)
            | Error::Format(message) => Some(serde_json::json!({ "message": message })),
            Error::StoreUnavailable { reason } => Some(serde_json::json!({ "reason": reason })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            Error::TomlParse(err) => Some(serde_json::json!({ "message": err.to_string() })),
            Error::Io(_) | Error::Json(_) | Error::TomlSerialize(_) => None,
        }
    }

    pub(crate) fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub(crate) fn unavailable(reason: impl std::fmt::Display) -> Self {
        Error::StoreUnavailable {
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for todolist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
