//! Error types for the stress agent.
//!
//! Everything except [`StressError::Append`] is recovered inside the service:
//! the caller always gets a best-effort [`Reading`](crate::core::Reading).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the scoring pipeline and the record source.
#[derive(Debug, Error)]
pub enum StressError {
    /// The record source is missing or could not be read.
    #[error("record source {path:?} unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV stream itself is structurally broken.
    #[error("record source {path:?} is not valid CSV: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A field of the latest record is missing or not a finite number.
    #[error("malformed record field {field}: {reason}")]
    MalformedRecord { field: &'static str, reason: String },

    /// The trained model failed for a single invocation.
    #[error("model inference failed: {0}")]
    ModelInference(#[from] ModelError),

    /// No reading has been published yet.
    #[error("no reading has been published yet")]
    StoreEmpty,

    /// Appending a simulated record to the source failed.
    #[error("failed to append to {path:?}: {reason}")]
    Append { path: PathBuf, reason: String },

    /// A reading could not be rendered for transport.
    #[error("reading field {field} is not finite")]
    InvalidReading { field: &'static str },
}

/// Errors from loading or evaluating the trained-model artifacts.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("non-finite value produced at {0}")]
    NonFinite(&'static str),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_converts_into_inference_failure() {
        let err: StressError = ModelError::NonFinite("output").into();
        assert!(matches!(err, StressError::ModelInference(_)));
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn test_append_error_mentions_path() {
        let err = StressError::Append {
            path: PathBuf::from("live.csv"),
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("live.csv"));
        assert!(msg.contains("disk full"));
    }
}
