//! Library errors using thiserror for structured error handling.
//!
//! These errors represent domain-specific failures that can occur while
//! acquiring frames or running the detection pipeline. They provide context
//! and can be chained with anyhow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("capture device is no longer available")]
    DeviceLost,

    #[error("failed to read next frame")]
    ReadFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("unsupported frame format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("frame is too small for detection ({width}x{height})")]
    FrameTooSmall { width: u32, height: u32 },

    #[error("detection not running")]
    NotRunning,

    #[error("failed to start detection thread")]
    ThreadSpawnFailed(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = SourceError::DeviceLost;
        assert_eq!(err.to_string(), "capture device is no longer available");

        let err = DetectorError::NotRunning;
        assert_eq!(err.to_string(), "detection not running");
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_err = ConfigError::LoadFailed {
            path: "/test/config.json".to_string(),
            source: Box::new(io_err),
        };

        assert!(config_err.source().is_some());
        assert_eq!(
            config_err.to_string(),
            "failed to load configuration from /test/config.json"
        );
    }

    #[test]
    fn test_frame_too_small_message() {
        let err = DetectorError::FrameTooSmall {
            width: 4,
            height: 4,
        };
        assert!(err.to_string().contains("4x4"));
    }
}
