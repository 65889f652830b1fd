//! The importer's entry point.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dynbridge_sdk::{safe_symbol_name, Extracted, SafeAdapterFn, TransferEnvelope, PROTOCOL_VERSION};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::imported::{ForeignFn, ImportedFunction, ImportedObject};
use crate::library::LibraryHandle;
use crate::loader::{LoaderPort, SystemLoader};

/// Controller for one loaded module.
///
/// Cheap to clone. The module stays loaded while the controller, any clone
/// of it, or anything imported through it is alive.
///
/// ```rust,ignore
/// let controller = ImportController::create("plugins/libwidgets.so")?;
/// let widget = controller.call_safe::<Widget>("MakeWidget")?;
/// drop(controller);
/// println!("{}", widget.name); // module still loaded
/// ```
#[derive(Debug, Clone)]
pub struct ImportController {
    library: Arc<LibraryHandle>,
}

impl ImportController {
    /// Load a module through the platform loader.
    ///
    /// Uses the default configuration plus `DYNBRIDGE_MODULE_DIR`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let config = BridgeConfig::default().with_env_overrides();
        Self::create_with(Arc::new(SystemLoader::new()), &config, path)
    }

    /// Load a module through `loader`, resolving and validating the path
    /// with `config`.
    pub fn create_with(
        loader: Arc<dyn LoaderPort>,
        config: &BridgeConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path: PathBuf = if loader.file_backed() {
            config.resolve_module_path(path)
        } else {
            path.as_ref().to_path_buf()
        };

        let library = LibraryHandle::open_with_policy(loader, path, &config.policy);
        if !library.is_active() {
            return Err(BridgeError::OpenFailed {
                path: library.path().to_path_buf(),
                reason: library.load_error().unwrap_or("module is not loaded").to_string(),
            });
        }

        Ok(Self::from_library(library))
    }

    /// Wrap an existing handle, loaded or not.
    ///
    /// Imports through a controller over an inactive handle fail with
    /// [`BridgeError::ControllerInactive`].
    pub fn from_library(library: LibraryHandle) -> Self {
        Self {
            library: Arc::new(library),
        }
    }

    pub fn path(&self) -> &Path {
        self.library.path()
    }

    pub fn is_active(&self) -> bool {
        self.library.is_active()
    }

    pub fn library(&self) -> &LibraryHandle {
        &self.library
    }

    /// Whether the module exports `name` exactly.
    pub fn has_export(&self, name: &str) -> bool {
        self.library.resolve(name).is_some()
    }

    /// Whether the module exports a safe adapter for `name`.
    pub fn has_safe_export(&self, name: &str) -> bool {
        self.has_export(&safe_symbol_name(name))
    }

    fn ensure_active(&self) -> Result<()> {
        if self.library.is_active() {
            Ok(())
        } else {
            Err(BridgeError::ControllerInactive {
                path: self.library.path().to_path_buf(),
            })
        }
    }

    /// Import a plain function by exact name.
    ///
    /// # Safety
    ///
    /// The symbol must be a function whose signature is exactly `F`.
    /// Nothing is checked.
    pub unsafe fn get_function<F: ForeignFn>(&self, name: &str) -> Result<ImportedFunction<F>> {
        self.ensure_active()?;

        let address = self
            .library
            .resolve(name)
            .ok_or_else(|| BridgeError::SymbolNotFound {
                symbol: name.to_string(),
            })?;

        // SAFETY: forwarded to the caller.
        let func = unsafe { F::from_address(address) };
        tracing::debug!(path = %self.path().display(), symbol = name, "Imported function");
        Ok(ImportedFunction::new(func, Arc::clone(&self.library)))
    }

    /// Call the safe export `name` and take the `T` it produces.
    ///
    /// The exporter's type is checked against `T`. A value of any other
    /// type is destroyed by the exporter and reported as
    /// [`BridgeError::TypeMismatch`].
    pub fn call_safe<T: 'static>(&self, name: &str) -> Result<ImportedObject<T>> {
        self.ensure_active()?;

        let symbol = safe_symbol_name(name);
        let address = self
            .library
            .resolve(&symbol)
            .ok_or_else(|| BridgeError::SymbolNotFound {
                symbol: symbol.clone(),
            })?;

        // SAFETY: symbols with the safe suffix are generated by the SDK
        // with exactly this signature.
        let adapter: SafeAdapterFn =
            unsafe { std::mem::transmute::<*mut c_void, SafeAdapterFn>(address.as_ptr()) };

        let raw = adapter();
        if raw.is_null() {
            tracing::warn!(path = %self.path().display(), symbol = name, "Safe export returned null");
            return Err(BridgeError::ResultReturnedNull {
                symbol: name.to_string(),
            });
        }

        // SAFETY: every envelope version keeps the version at offset 0.
        let version = unsafe { TransferEnvelope::peek_protocol_version(raw) };
        if version != PROTOCOL_VERSION {
            // The layout is unknown, so the envelope cannot be released.
            tracing::warn!(
                path = %self.path().display(),
                symbol = name,
                expected = PROTOCOL_VERSION,
                found = version,
                "Incompatible envelope protocol, leaking envelope"
            );
            return Err(BridgeError::IncompatibleProtocol {
                symbol: name.to_string(),
                expected: PROTOCOL_VERSION,
                found: version,
            });
        }

        // SAFETY: non-null, produced by an adapter of this protocol
        // version, and not touched again after this point.
        let envelope = unsafe { TransferEnvelope::from_raw(raw) };

        match envelope.extract::<T>() {
            Extracted::Value(value) => {
                tracing::debug!(path = %self.path().display(), symbol = name, "Imported object");
                Ok(ImportedObject::new(value, Arc::clone(&self.library)))
            }
            Extracted::Error(error) => {
                tracing::warn!(path = %self.path().display(), symbol = name, "Exporter failure: {}", error);
                Err(BridgeError::ExporterFailure {
                    symbol: name.to_string(),
                    message: error.message,
                })
            }
            Extracted::TypeMismatch { found } => {
                let error = BridgeError::TypeMismatch {
                    symbol: name.to_string(),
                    requested: std::any::type_name::<T>(),
                    found,
                };
                tracing::warn!(
                    path = %self.path().display(),
                    symbol = name,
                    build_mismatch = error.is_build_mismatch(),
                    "{}",
                    error
                );
                Err(error)
            }
        }
    }
}
