//! Error types for the geoparse core
//!
//! Provides:
//! - Distinct error variants for each failure mode of the pipeline
//! - Machine-readable error codes
//! - Retry classification for callers driving re-runs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvariantViolation,

    // Resource errors (4xxx)
    NotFound,
    ProjectNotFound,
    DocumentNotFound,
    FeatureNotFound,

    // Capability errors (6xxx)
    TrainingUnsupported,
    NoTrainingData,
    CapabilityFailed,
    CapabilityTimeout,
    CapabilityContract,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvariantViolation => 1002,

            ErrorCode::NotFound => 4001,
            ErrorCode::ProjectNotFound => 4002,
            ErrorCode::DocumentNotFound => 4003,
            ErrorCode::FeatureNotFound => 4004,

            ErrorCode::TrainingUnsupported => 6001,
            ErrorCode::NoTrainingData => 6002,
            ErrorCode::CapabilityFailed => 6003,
            ErrorCode::CapabilityTimeout => 6004,
            ErrorCode::CapabilityContract => 6005,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::InternalError => 9001,
            ErrorCode::SerializationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// A span that would break a corpus invariant (bounds or same-layer overlap)
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Feature not found: {gazetteer_name}:{identifier}")]
    FeatureNotFound {
        gazetteer_name: String,
        identifier: String,
    },

    // Capability errors
    #[error("Module '{module}' does not implement a fit method")]
    TrainingUnsupported { module: String },

    #[error("No training examples found for module '{module}'")]
    NoTrainingData { module: String },

    #[error("Module '{module}' failed: {message}")]
    CapabilityFailed { module: String, message: String },

    #[error("Module '{module}' timed out after {timeout_ms}ms")]
    CapabilityTimeout { module: String, timeout_ms: u64 },

    #[error("Module '{module}' broke its output contract: {message}")]
    CapabilityContract { module: String, message: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvariantViolation { .. } => ErrorCode::InvariantViolation,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::FeatureNotFound { .. } => ErrorCode::FeatureNotFound,
            AppError::TrainingUnsupported { .. } => ErrorCode::TrainingUnsupported,
            AppError::NoTrainingData { .. } => ErrorCode::NoTrainingData,
            AppError::CapabilityFailed { .. } => ErrorCode::CapabilityFailed,
            AppError::CapabilityTimeout { .. } => ErrorCode::CapabilityTimeout,
            AppError::CapabilityContract { .. } => ErrorCode::CapabilityContract,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::InternalError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. }
                | AppError::ProjectNotFound { .. }
                | AppError::DocumentNotFound { .. }
                | AppError::FeatureNotFound { .. }
        )
    }

    /// Check if re-invoking the same run may succeed.
    ///
    /// Already processed units are skipped on a re-run, so transient failures
    /// of the capability or the store are safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::CapabilityFailed { .. }
                | AppError::CapabilityTimeout { .. }
                | AppError::Database(_)
                | AppError::DatabaseConnection { .. }
        )
    }

    /// Build an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        AppError::InvariantViolation {
            message: message.into(),
        }
    }

    /// Build a validation error for a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}
