//! Error types for module loading and import.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single import operation.
///
/// Every variant is attributable to the call that returned it. An import
/// either fully succeeds or fails without leaking the envelope.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to open module {}: {reason}", path.display())]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Controller for {} is not active", path.display())]
    ControllerInactive { path: PathBuf },

    #[error("Symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("Exporter failure in {symbol}: {message}")]
    ExporterFailure { symbol: String, message: String },

    #[error("Safe export {symbol} returned a null envelope")]
    ResultReturnedNull { symbol: String },

    #[error(
        "Type mismatch in {symbol}: requested {requested}, module produced {found}{}",
        build_hint(.requested, .found)
    )]
    TypeMismatch {
        symbol: String,
        requested: &'static str,
        found: String,
    },

    #[error("Incompatible protocol in {symbol}: expected version {expected}, got {found}")]
    IncompatibleProtocol {
        symbol: String,
        expected: u32,
        found: u32,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Extra diagnosis when both sides name the same type.
///
/// Equal names with different type identities mean the module and the host
/// were compiled separately (other features, flags or compiler).
fn build_hint(requested: &str, found: &str) -> &'static str {
    if requested == found {
        " (same type name, different build; rebuild module and host together)"
    } else {
        ""
    }
}

impl BridgeError {
    /// Whether this is a type mismatch between identically named types.
    pub fn is_build_mismatch(&self) -> bool {
        matches!(self, BridgeError::TypeMismatch { requested, found, .. } if requested == found)
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure reported by a [`LoaderPort`](crate::loader::LoaderPort) or by
/// load policy validation.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid module: {0}")]
    InvalidModule(String),

    #[error("Path not allowed: {0}")]
    NotAllowed(String),

    #[error("Module too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Handle does not belong to this loader")]
    ForeignHandle,
}

impl From<libloading::Error> for LoadError {
    fn from(err: libloading::Error) -> Self {
        LoadError::Loader(err.to_string())
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
