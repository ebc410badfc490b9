//! Error types for volume loading and placement

use thiserror::Error;

/// Main error type for volume operations
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("Invalid scale: {0}")]
    InvalidScale(String),

    #[error("Degenerate brick: {0}")]
    DegenerateBrick(String),

    #[error("Volume is not loaded")]
    Uninitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized Result type for volume operations
pub type Result<T> = std::result::Result<T, VolumeError>;

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        VolumeError::MalformedMetadata(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_errors_are_malformed_metadata() {
        let err: VolumeError = serde_json::from_str::<u32>("\"seven\"").unwrap_err().into();
        assert!(matches!(err, VolumeError::MalformedMetadata(_)));
    }

    #[test]
    fn test_error_display() {
        let err = VolumeError::InvalidScale("component 2 is 0".to_string());
        assert_eq!(err.to_string(), "Invalid scale: component 2 is 0");
        assert_eq!(VolumeError::Uninitialized.to_string(), "Volume is not loaded");
    }
}
