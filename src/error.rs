//! Error types for the import/export tool
//!
//! Provides structured error handling with context and proper error chains.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the import/export tool
#[derive(Error, Debug)]
pub enum JackError {
    /// Configuration errors (defaults file, overrides, transport selection)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Precondition violations raised before touching the repository
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Repository and transport errors (login, engine, network)
    #[error("Repository error: {message}")]
    Repository {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// System-view / document-view encoding and decoding errors
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// File system operation errors
    #[error("File system error: {operation} failed on {path}")]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Export failures, carrying the attempted destination
    #[error("Failed to export repository at {base_path} to file {path}")]
    Export {
        path: PathBuf,
        base_path: String,
        #[source]
        source: Box<JackError>,
    },

    /// Import failures, carrying the attempted source file
    #[error("Failed to import repository to {base_path} from file {path}")]
    Import {
        path: PathBuf,
        base_path: String,
        #[source]
        source: Box<JackError>,
    },
}

impl JackError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error wrapping an underlying cause
    pub fn config_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new repository error
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            source: None,
        }
    }

    /// Create a repository error wrapping an underlying cause
    pub fn repository_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Repository {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Create a serialization error wrapping an underlying cause
    pub fn serialization_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new file system error
    pub fn file_system<P: Into<PathBuf>>(
        operation: impl Into<String>,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Wrap a failure with the export destination and base path
    pub fn export<P: Into<PathBuf>>(path: P, base_path: impl Into<String>, source: Self) -> Self {
        Self::Export {
            path: path.into(),
            base_path: base_path.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure with the import source file and base path
    pub fn import<P: Into<PathBuf>>(path: P, base_path: impl Into<String>, source: Self) -> Self {
        Self::Import {
            path: path.into(),
            base_path: base_path.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, JackError>;
