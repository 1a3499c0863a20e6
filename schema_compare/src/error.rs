//! Error types for SchemaCompare

use thiserror::Error;

/// Result type for SchemaCompare operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SchemaCompare
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A provider answered in a shape that breaks the provider contract,
    /// e.g. a listed routine whose definition cannot be read back.
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("{object_type} not found: {name}")]
    ObjectNotFound { object_type: String, name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    pub(crate) fn not_found(object_type: &str, name: &str) -> Self {
        Error::ObjectNotFound {
            object_type: object_type.to_string(),
            name: name.to_string(),
        }
    }
}

/// Convert Serde JSON errors to SchemaCompare errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert Serde YAML errors to SchemaCompare errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to SchemaCompare errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
