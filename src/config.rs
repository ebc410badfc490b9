//! Load options

use crate::error::{Result, VolumeError};
use crate::types::CURVE_ENCODED_EXTENSION;
use serde::{Deserialize, Serialize};

/// Options controlling how a volume is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Name of the metadata document inside the data directory
    pub metadata_file_name: String,

    /// Extension tag that marks curve-encoded bricks
    pub curve_extension: String,

    /// Upper bound on brick depth queries in flight at once
    pub max_concurrent_queries: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            metadata_file_name: "metadata.json".to_string(),
            curve_extension: CURVE_ENCODED_EXTENSION.to_string(),
            max_concurrent_queries: 64,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metadata document name
    pub fn with_metadata_file_name(mut self, name: impl Into<String>) -> Self {
        self.metadata_file_name = name.into();
        self
    }

    /// Set the curve-encoded extension tag
    pub fn with_curve_extension(mut self, extension: impl Into<String>) -> Self {
        self.curve_extension = extension.into();
        self
    }

    /// Set the query concurrency bound
    pub fn with_max_concurrent_queries(mut self, limit: usize) -> Self {
        self.max_concurrent_queries = limit;
        self
    }

    /// Parse options from JSON; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)
            .map_err(|e| VolumeError::Configuration(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata_file_name.is_empty() {
            return Err(VolumeError::Configuration(
                "metadata_file_name must not be empty".to_string(),
            ));
        }
        if !self.curve_extension.starts_with('.') {
            return Err(VolumeError::Configuration(format!(
                "curve_extension must start with '.', got {:?}",
                self.curve_extension
            )));
        }
        if self.max_concurrent_queries == 0 {
            return Err(VolumeError::Configuration(
                "max_concurrent_queries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.metadata_file_name, "metadata.json");
        assert_eq!(options.curve_extension, ".hz");
        options.validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = LoadOptions::from_json(r#"{ "max_concurrent_queries": 8 }"#).unwrap();
        assert_eq!(options.max_concurrent_queries, 8);
        assert_eq!(options.metadata_file_name, "metadata.json");
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            LoadOptions::new().with_max_concurrent_queries(0).validate(),
            Err(VolumeError::Configuration(_))
        ));
        assert!(matches!(
            LoadOptions::new().with_curve_extension("hz").validate(),
            Err(VolumeError::Configuration(_))
        ));
        assert!(matches!(
            LoadOptions::from_json(r#"{ "metadata_file_name": "" }"#),
            Err(VolumeError::Configuration(_))
        ));
    }
}
