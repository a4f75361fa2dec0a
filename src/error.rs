//! Error types for ScaleBench
//!
//! Every failure in this crate is terminal for the invoking command: nothing
//! is retried. Errors carry enough context (paths, timestamps, offending
//! values) for an operator to correct the input and re-run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ScaleBench operations
#[derive(Error, Debug)]
pub enum ScaleBenchError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid cluster, benchmark or experiment configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Worker type and locality combination without a hardware mapping
    #[error("Unsupported worker configuration: type '{worker_type}' with locality per '{locality_per}'")]
    UnsupportedWorker {
        worker_type: String,
        locality_per: String,
    },

    /// JSON document could not be parsed
    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// Timestamp in a raw result could not be interpreted
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Raw benchmark result expected but not present
    #[error("Benchmark result not found: {0}")]
    MissingResult(PathBuf),

    /// The epoch is later than the start of a benchmark
    #[error("Epoch passed in is later than epoch from benchmark: {epoch} > {start}")]
    EpochAfterStart { epoch: String, start: String },

    /// The reference configuration is not among the measurements
    #[error("No reference measurement found: {0}")]
    MissingReference(String),

    /// Dataset file has an unexpected layout
    #[error("Dataset error: {0}")]
    DatasetError(String),

    /// Dataset already exists where a new one must be created
    #[error("Dataset already exists: {0}")]
    DatasetExists(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ScaleBenchError>,
    },
}

impl ScaleBenchError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a dataset layout error
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::DatasetError(message.into())
    }

    /// Create a parse error for a document at `path`
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error stems from invalid user configuration
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::UnsupportedWorker { .. } => true,
            Self::WithContext { source, .. } => source.is_config_error(),
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::MissingResult(path)
            | Self::DatasetExists(path) => Some(path),
            Self::WithContext { source, .. } => source.path(),
            _ => None,
        }
    }
}

/// Result type alias for ScaleBench operations
pub type Result<T> = std::result::Result<T, ScaleBenchError>;

impl From<std::io::Error> for ScaleBenchError {
    fn from(err: std::io::Error) -> Self {
        ScaleBenchError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ScaleBenchError {
    fn from(err: serde_json::Error) -> Self {
        ScaleBenchError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| ScaleBenchError::io(path, e))
    }
}

/// Read a JSON document from `path` into `T`
pub fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_path(path)?;
    serde_json::from_str(&content).map_err(|e| ScaleBenchError::parse(path, e))
}
