//! Ownership of one loaded module.
//!
//! A [`LibraryHandle`] is shared through `Arc` by the controller and by
//! every imported function and object. The module is unloaded in `Drop`,
//! so it stays loaded exactly as long as something derived from it lives.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::LoadPolicy;
use crate::loader::{LoaderPort, NativeHandle, SymbolAddress};

/// Whether a [`LibraryHandle`] currently holds a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryState {
    Active,
    Inactive,
}

/// One loaded (or failed-to-load) module.
pub struct LibraryHandle {
    path: PathBuf,
    loader: Arc<dyn LoaderPort>,
    native: Mutex<Option<NativeHandle>>,
    loaded_at: Option<DateTime<Utc>>,
    load_error: Option<String>,
}

impl LibraryHandle {
    /// Load `path` through `loader`.
    ///
    /// Always returns a handle. Check [`is_active`](Self::is_active) and
    /// [`load_error`](Self::load_error) to see whether loading worked.
    pub fn open(loader: Arc<dyn LoaderPort>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let result = loader.open(&path);
        Self::from_open_result(loader, path, result.map_err(|e| e.to_string()))
    }

    /// Like [`open`](Self::open), validating the file against `policy` first
    /// when the loader reads files from disk and the policy applies to
    /// `path` (see [`LoadPolicy::applies_to`]).
    pub fn open_with_policy(
        loader: Arc<dyn LoaderPort>,
        path: impl Into<PathBuf>,
        policy: &LoadPolicy,
    ) -> Self {
        let path = path.into();
        if loader.file_backed() && policy.applies_to(&path) {
            if let Err(e) = policy.validate_path(&path) {
                return Self::from_open_result(loader, path, Err(e.to_string()));
            }
        }
        Self::open(loader, path)
    }

    fn from_open_result(
        loader: Arc<dyn LoaderPort>,
        path: PathBuf,
        result: Result<NativeHandle, String>,
    ) -> Self {
        match result {
            Ok(native) => {
                tracing::info!(path = %path.display(), loader = loader.name(), "Module loaded");
                Self {
                    path,
                    loader,
                    native: Mutex::new(Some(native)),
                    loaded_at: Some(Utc::now()),
                    load_error: None,
                }
            }
            Err(reason) => {
                tracing::warn!(path = %path.display(), loader = loader.name(), "Failed to load module: {}", reason);
                Self {
                    path,
                    loader,
                    native: Mutex::new(None),
                    loaded_at: None,
                    load_error: Some(reason),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.native.lock().is_some()
    }

    pub fn state(&self) -> LibraryState {
        if self.is_active() {
            LibraryState::Active
        } else {
            LibraryState::Inactive
        }
    }

    /// When the module was loaded. `None` if loading failed.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Why loading failed. `None` for a handle that loaded.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Look up `name` exactly as given. `None` when absent or inactive.
    pub fn resolve(&self, name: &str) -> Option<SymbolAddress> {
        let native = self.native.lock();
        let address = self.loader.resolve(native.as_ref()?, name);
        tracing::debug!(path = %self.path.display(), symbol = name, found = address.is_some(), "Resolved symbol");
        address
    }

    /// Unload the module if it is loaded. Later calls do nothing.
    pub(crate) fn close(&self) {
        let mut native = self.native.lock();
        let Some(handle) = native.take() else {
            return;
        };

        match self.loader.close(handle) {
            Ok(()) => tracing::info!(path = %self.path.display(), "Module unloaded"),
            Err(e) => tracing::warn!(path = %self.path.display(), "Failed to unload module: {}", e),
        }
    }
}

impl Drop for LibraryHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("path", &self.path)
            .field("loader", &self.loader.name())
            .field("state", &self.state())
            .field("loaded_at", &self.loaded_at)
            .field("load_error", &self.load_error)
            .finish()
    }
}
