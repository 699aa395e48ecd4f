//! Error types for appfetch
//!
//! All modules use `AppfetchResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for appfetch operations
pub type AppfetchResult<T> = Result<T, AppfetchError>;

/// All errors that can occur in appfetch
#[derive(Error, Debug)]
pub enum AppfetchError {
    // Descriptor errors
    #[error("The protocol '{protocol}' used in '{descriptor}' is not supported. Only http: and https: protocols are supported")]
    UnsupportedProtocol {
        protocol: String,
        descriptor: String,
    },

    #[error("The application at '{0}' does not exist or is not accessible")]
    NotFound(String),

    // Transfer errors
    #[error("Cannot download the application from {url}: {cause}")]
    DownloadFailure { url: String, cause: String },

    // Archive errors
    #[error("The archive at '{path}' is not a valid zip file: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Archive '{archive}' unzipped OK, but no bundles matching {extensions} were found in it")]
    NoBundleFound { archive: PathBuf, extensions: String },

    #[error("New app path '{path}' did not have extension(s) {supported}")]
    UnsupportedExtension { path: PathBuf, supported: String },

    #[error("At least one supported bundle extension must be provided")]
    NoExtensions,

    // Capability parsing
    #[error("Must provide a string or JSON array; received {0}")]
    ParseFailure(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppfetchError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a download failure for the given source
    pub fn download(url: impl Into<String>, cause: impl ToString) -> Self {
        Self::DownloadFailure {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    /// Create an invalid archive error
    pub fn invalid_archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedProtocol { .. } => {
                Some("Pass an absolute local path or an http(s) URL")
            }
            Self::NotFound(_) => Some("Check the path exists and is readable"),
            Self::NoBundleFound { .. } => {
                Some("Make sure the archive contains at least one package with a supported extension")
            }
            Self::UnsupportedExtension { .. } => Some("Pass --ext with the bundle's extension"),
            _ => None,
        }
    }
}
