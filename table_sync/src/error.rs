//! Error types for table_sync

use thiserror::Error;

/// Result type for table_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for table_sync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Conflicting constraints on {table}.{field}: {reason}")]
    ConflictingConstraint {
        table: String,
        field: String,
        reason: String,
    },

    #[error("Unsupported type '{field_type}' for {table}.{field}")]
    UnsupportedType {
        table: String,
        field: String,
        field_type: String,
    },

    #[error("Reserved table name: {0}")]
    ReservedTableName(String),

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Cyclic dependency detected involving table '{table}'")]
    CyclicDependency { table: String },

    #[error("Failed to create table '{table}': {message}")]
    CreateTable { table: String, message: String },

    #[error("Failed to drop table '{table}': {message}")]
    DropTable { table: String, message: String },

    #[error("Failed to {operation} column {table}.{column}: {message}")]
    DdlApply {
        table: String,
        column: String,
        operation: String,
        message: String,
    },

    #[error("Failed to write backup for table '{table}': {message}")]
    BackupWrite { table: String, message: String },

    #[error("Failed to replay backup '{path}' into table '{table}': {message}")]
    RestoreReplay {
        table: String,
        path: String,
        message: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Whether the error is a configuration problem detected before any DDL ran
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ConfigError(_)
                | Error::ConflictingConstraint { .. }
                | Error::UnsupportedType { .. }
                | Error::ReservedTableName(_)
                | Error::InvalidIdentifier(_)
        )
    }
}

/// Convert Serde JSON errors to table_sync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to table_sync errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to table_sync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
