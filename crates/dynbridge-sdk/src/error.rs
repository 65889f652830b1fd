//! Error payload carried inside a transfer envelope.

use thiserror::Error;

/// Failure reported by an exporting module instead of a value.
///
/// Created by the export adapter when the factory panics, returns an
/// error, or returns null. The importer surfaces `message` unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExportError {
    pub message: String,
}

impl ExportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Message used when the factory produced a null pointer.
    pub fn returned_null() -> Self {
        Self::new("returned null pointer")
    }

    /// Message used when the factory declares an untyped pointer result.
    pub fn untyped_pointer() -> Self {
        Self::new("factory returns an untyped pointer")
    }

    /// Generic message for failures inside the adapter itself.
    pub fn adapter_failed() -> Self {
        Self::new("export adapter failed")
    }
}
