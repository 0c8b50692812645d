//! Error Handling Module
//!
//! Defines the error type shared by dataset loading, splitting and the
//! dataset façade. Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for SSL dataset operations
#[derive(Error, Debug)]
pub enum SslDatasetError {
    /// Dataset name is not one of the supported kinds, or has no registered source
    #[error("Unsupported dataset: {0}")]
    UnsupportedDataset(String),

    /// Invalid configuration parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// A class holds fewer samples than its labeled quota
    #[error("Insufficient samples for class {class}: {available} available, {required} required")]
    InsufficientSamples {
        class: usize,
        available: usize,
        required: usize,
    },

    /// Inconsistent inputs (length mismatches, bad indices, bad targets)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error reading or decoding dataset contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SslDatasetError {
    fn from(err: serde_json::Error) -> Self {
        SslDatasetError::Serialization(err.to_string())
    }
}

/// Convenience Result type for SSL dataset operations
pub type Result<T> = std::result::Result<T, SslDatasetError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| SslDatasetError::Dataset(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| SslDatasetError::Dataset(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| SslDatasetError::Dataset(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| SslDatasetError::Dataset(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SslDatasetError::UnsupportedDataset("mnist".to_string());
        assert_eq!(format!("{}", err), "Unsupported dataset: mnist");
    }

    #[test]
    fn test_insufficient_samples_display() {
        let err = SslDatasetError::InsufficientSamples {
            class: 3,
            available: 1,
            required: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("class 3"));
        assert!(msg.contains("1 available"));
        assert!(msg.contains("4 required"));
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/data/ucm/agricultural00.tif");
        let err = SslDatasetError::ImageLoad(path, "unsupported format".to_string());
        assert!(format!("{}", err).contains("agricultural00.tif"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: SslDatasetError = parse.unwrap_err().into();
        assert!(matches!(err, SslDatasetError::Serialization(_)));
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<i32, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));

        let with_context = result.context("Failed to read batch file");
        assert!(with_context.unwrap_err().to_string().contains("Failed to read batch file"));
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let with_context = opt.with_context(|| "class list was empty".to_string());
        assert!(with_context.is_err());
    }
}
