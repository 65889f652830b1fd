//! Module search paths and load policy.
//!
//! ```toml
//! search_paths = ["/opt/app/modules"]
//!
//! [policy]
//! allowed_paths = []
//! require_platform_extension = false
//! max_file_size = 104857600
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LoadError};
use crate::loader::is_module_file;

/// Environment variable holding extra module directories (platform path list).
pub const MODULE_DIR_ENV: &str = "DYNBRIDGE_MODULE_DIR";

/// Default upper bound for a module file (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Importer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directories probed when a module is named without a path.
    pub search_paths: Vec<PathBuf>,

    /// Checks applied to a module file before it is loaded.
    pub policy: LoadPolicy,
}

/// Checks applied to a module file before the loader sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadPolicy {
    /// Directories modules must live under. Empty means unrestricted.
    pub allowed_paths: Vec<PathBuf>,

    /// Reject files without the platform's shared library extension.
    pub require_platform_extension: bool,

    /// Maximum module file size in bytes.
    pub max_file_size: u64,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            allowed_paths: Vec::new(),
            require_platform_extension: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl LoadPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_allowed_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.allowed_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_platform_extension(mut self, require: bool) -> Self {
        self.require_platform_extension = require;
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Whether the policy limits where modules may come from.
    ///
    /// An unrestricted policy lets bare names such as `libm.so.6` through to
    /// the platform loader's own search.
    pub fn is_restricted(&self) -> bool {
        !self.allowed_paths.is_empty() || self.require_platform_extension
    }

    /// Whether `path` has to pass [`validate_path`](Self::validate_path)
    /// before it is loaded.
    pub fn applies_to(&self, path: &Path) -> bool {
        self.is_restricted() || path.exists()
    }

    /// Validate a module file path.
    pub fn validate_path(&self, path: &Path) -> Result<(), LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.display().to_string()));
        }

        if !path.is_file() {
            return Err(LoadError::InvalidModule(format!(
                "Path is not a file: {}",
                path.display()
            )));
        }

        if self.require_platform_extension && !is_module_file(path) {
            return Err(LoadError::InvalidModule(format!(
                "Expected a .{} file: {}",
                std::env::consts::DLL_EXTENSION,
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path).map_err(|e| {
            LoadError::InvalidModule(format!("Cannot read file metadata: {}", e))
        })?;
        if metadata.len() > self.max_file_size {
            return Err(LoadError::TooLarge {
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        if !self.allowed_paths.is_empty() {
            let canonical_path = path
                .canonicalize()
                .map_err(|e| LoadError::InvalidModule(format!("Cannot canonicalize: {}", e)))?;

            let is_allowed = self.allowed_paths.iter().any(|allowed| {
                allowed
                    .canonicalize()
                    .map(|canonical| canonical_path.starts_with(canonical))
                    .unwrap_or(false)
            });

            if !is_allowed {
                return Err(LoadError::NotAllowed(format!(
                    "Module path is outside allowed directories: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Prepend directories from `DYNBRIDGE_MODULE_DIR`.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var_os(MODULE_DIR_ENV) {
            Some(value) => self.with_module_dirs(&value),
            None => self,
        }
    }

    fn with_module_dirs(mut self, value: &std::ffi::OsStr) -> Self {
        let mut paths: Vec<PathBuf> = std::env::split_paths(value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !paths.is_empty() {
            tracing::debug!(count = paths.len(), "Adding module directories from {}", MODULE_DIR_ENV);
            paths.append(&mut self.search_paths);
            self.search_paths = paths;
        }
        self
    }

    /// Turn a module name into a path.
    ///
    /// Names that contain a separator or already exist are returned as-is.
    /// Otherwise each search path is probed for the platform file name
    /// (`widgets` becomes `libwidgets.so` on Linux). Falls back to `name`.
    pub fn resolve_module_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.components().count() > 1 || name.exists() {
            return name.to_path_buf();
        }

        let file_name = libloading::library_filename(name);
        for dir in &self.search_paths {
            for candidate in [dir.join(&file_name), dir.join(name)] {
                if candidate.is_file() {
                    return candidate;
                }
            }
        }

        name.to_path_buf()
    }

    /// List module files in the search paths.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut modules = Vec::new();

        for dir in &self.search_paths {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(path = %dir.display(), "Skipping search path: {}", e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && is_module_file(&path) {
                    tracing::debug!(path = %path.display(), "Discovered module");
                    modules.push(path);
                }
            }
        }

        modules.sort();
        modules
    }
}
