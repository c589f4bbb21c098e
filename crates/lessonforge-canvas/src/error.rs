//! Error types for lessonforge-canvas
//!
//! This module provides the error taxonomy for the editor core:
//! gateway lookups, saves, migration and storage failures.

use thiserror::Error;

/// Editor error type
#[derive(Debug, Error)]
pub enum Error {
    /// Requested lesson does not exist upstream
    #[error("lesson not found: {0}")]
    NotFound(String),

    /// The persisted schema cannot hold the requested field
    #[error("schema incompatible: {0}")]
    SchemaIncompatible(String),

    /// Slide fetch for a presentation migration failed
    #[error("migration failed: {0}")]
    MigrationFailure(String),

    /// The canvas still shows a migration placeholder and cannot be saved
    #[error("migration pending: {0}")]
    MigrationPending(String),

    /// Persistence gateway write failed
    #[error("save failed: {0}")]
    SaveFailure(String),

    /// Block type tag is not present in the registry
    #[error("invalid block type: {0}")]
    InvalidBlockType(String),

    /// Save requested while no lesson is open
    #[error("no lesson selected")]
    NoLessonSelected,

    /// A save for the current lesson is already in flight
    #[error("save already in progress")]
    SaveInProgress,

    /// A newer lesson open replaced this one before it finished
    #[error("superseded by a newer load: {0}")]
    Superseded(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a save failure
    #[must_use]
    pub fn save_failure(msg: impl Into<String>) -> Self {
        Self::SaveFailure(msg.into())
    }

    /// Create a migration failure
    #[must_use]
    pub fn migration_failure(msg: impl Into<String>) -> Self {
        Self::MigrationFailure(msg.into())
    }

    /// Create a database error
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Check if error is recoverable (retrying the call may succeed)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SaveFailure(_)
                | Self::SaveInProgress
                | Self::MigrationFailure(_)
                | Self::MigrationPending(_)
                | Self::Database(_)
        )
    }

    /// Get a stable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::SchemaIncompatible(_) => "schema_incompatible",
            Self::MigrationFailure(_) => "migration_failure",
            Self::MigrationPending(_) => "migration_pending",
            Self::SaveFailure(_) => "save_failure",
            Self::InvalidBlockType(_) => "invalid_block_type",
            Self::NoLessonSelected => "no_lesson_selected",
            Self::SaveInProgress => "save_in_progress",
            Self::Superseded(_) => "superseded",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for editor operations
pub type Result<T> = std::result::Result<T, Error>;
