//! Core data types for bricked volumes

use crate::error::{Result, VolumeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extension tag of curve-encoded (hierarchical Z order) bricks
pub const CURVE_ENCODED_EXTENSION: &str = ".hz";

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Endianness {
    /// No tag given; only acceptable for single-byte samples
    #[default]
    Unspecified = 0,
    /// Least significant byte first
    Little = 1,
    /// Most significant byte first
    Big = 2,
}

impl Endianness {
    /// Parse the tag found in a metadata document
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(Endianness::Unspecified);
        }
        match tag.to_ascii_lowercase().as_str() {
            "little" => Ok(Endianness::Little),
            "big" => Ok(Endianness::Big),
            _ => Err(VolumeError::MalformedMetadata(format!(
                "Unknown endianness tag: {:?}",
                tag
            ))),
        }
    }

    /// Check whether a tag was present in the document
    pub fn is_specified(&self) -> bool {
        !matches!(self, Endianness::Unspecified)
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Unspecified => write!(f, "unspecified"),
            Endianness::Little => write!(f, "little"),
            Endianness::Big => write!(f, "big"),
        }
    }
}

/// File-extension tag describing how brick payloads are stored.
///
/// The tag keeps its leading dot (`".hz"`, `".raw"`) and is empty when the
/// filename has no extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BrickDataType(String);

impl BrickDataType {
    /// Create a tag from an explicit extension string
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Derive the tag from a brick filename
    pub fn from_filename(filename: impl AsRef<Path>) -> Self {
        let tag = filename
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        Self(tag)
    }

    /// The raw tag
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this tag marks a curve-encoded layout
    pub fn is_curve_encoded(&self, curve_extension: &str) -> bool {
        self.0 == curve_extension
    }
}

impl fmt::Display for BrickDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness_parse() {
        assert_eq!(Endianness::parse("little").unwrap(), Endianness::Little);
        assert_eq!(Endianness::parse("BIG").unwrap(), Endianness::Big);
        assert_eq!(Endianness::parse("").unwrap(), Endianness::Unspecified);
        assert!(!Endianness::parse(" ").unwrap().is_specified());
        assert!(matches!(
            Endianness::parse("middle"),
            Err(VolumeError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_brick_data_type_from_filename() {
        let hz = BrickDataType::from_filename("bricks/b_0_0_0.hz");
        assert_eq!(hz.as_str(), ".hz");
        assert!(hz.is_curve_encoded(CURVE_ENCODED_EXTENSION));

        let raw = BrickDataType::from_filename("b_0_0_0.raw");
        assert!(!raw.is_curve_encoded(CURVE_ENCODED_EXTENSION));

        let bare = BrickDataType::from_filename("brick");
        assert_eq!(bare.as_str(), "");
        assert_eq!(bare.to_string(), "<none>");
    }
}
