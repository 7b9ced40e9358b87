//! Error types for the MSH codec.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for MSH operations.
///
/// Decoding and encoding fail fast: the first error aborts the whole operation
/// and no partially built scene is returned.
#[derive(Error, Debug)]
pub enum Error {
    /// A read would run past the end of the current chunk scope
    #[error("Truncated data: need {needed} bytes at offset {offset}, scope ends at {end}")]
    Truncated { offset: usize, needed: usize, end: usize },

    /// An index references a material, model, vertex or envelope entry out of range
    #[error("{kind} index {index} out of range (count: {len})")]
    UnsupportedIndex { kind: &'static str, index: u32, len: usize },

    /// A type or shape tag does not map to a known variant
    #[error("Invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: u32 },

    /// A parent chain does not terminate
    #[error("Parent chain of model '{0}' contains a cycle")]
    CyclicParent(String),

    /// Geometry that cannot be represented or does not make sense
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Two models declare the same MNDX
    #[error("Model index {0} declared more than once")]
    DuplicateModelIndex(u32),

    /// A model names a parent that is not in the scene
    #[error("Model '{model}' references unknown parent '{parent}'")]
    UnresolvedParent { model: String, parent: String },

    /// A segment names a material that is not in the scene
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// A host object violates an export naming or shape rule
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create a degenerate geometry error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    /// Create an out-of-range index error.
    pub fn index(kind: &'static str, index: u32, len: usize) -> Self {
        Self::UnsupportedIndex { kind, index, len }
    }
}

/// Result type alias for MSH operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::Truncated { offset: 10, needed: 4, end: 12 };
        assert!(e.to_string().contains("10"));
        assert!(e.to_string().contains("12"));

        let e = Error::index("material", 5, 3);
        assert!(e.to_string().starts_with("material"));
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
