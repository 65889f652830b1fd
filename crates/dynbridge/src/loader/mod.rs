//! Platform loader capability.
//!
//! A [`LoaderPort`] is the only thing that touches the OS dynamic loader.
//! It offers three operations (open a module, resolve a symbol, close the
//! module) and nothing else. [`LibraryHandle`](crate::library::LibraryHandle)
//! serializes calls into it.

pub mod static_table;
pub mod system;

use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::path::Path;
use std::ptr::NonNull;

pub use static_table::{ModuleTable, StaticLoader};
pub use system::SystemLoader;

use crate::error::LoadError;

/// Opaque identity of one loaded module, owned by the loader that created it.
pub struct NativeHandle(Box<dyn Any + Send + Sync>);

impl NativeHandle {
    pub fn new<H: Any + Send + Sync>(inner: H) -> Self {
        Self(Box::new(inner))
    }

    pub fn downcast_ref<H: Any>(&self) -> Option<&H> {
        self.0.downcast_ref::<H>()
    }

    /// Recover the loader-specific handle, or give `self` back untouched.
    pub fn into_inner<H: Any>(self) -> std::result::Result<H, NativeHandle> {
        match self.0.downcast::<H>() {
            Ok(inner) => Ok(*inner),
            Err(other) => Err(NativeHandle(other)),
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeHandle(..)")
    }
}

/// Address of a resolved symbol.
///
/// Only meaningful while the module it came from stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolAddress(NonNull<c_void>);

// SAFETY: an address is plain data; dereferencing it is what needs care.
unsafe impl Send for SymbolAddress {}
unsafe impl Sync for SymbolAddress {}

impl SymbolAddress {
    pub fn new(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    /// Address of a function compiled into the current binary.
    pub fn from_fn(f: *const ()) -> Option<Self> {
        Self::new(f as *mut c_void)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// The three-operation capability supplied by the platform loader.
pub trait LoaderPort: Send + Sync {
    /// Load the module at `path`.
    fn open(&self, path: &Path) -> Result<NativeHandle, LoadError>;

    /// Look up `name` exactly as given. `None` when absent.
    fn resolve(&self, handle: &NativeHandle, name: &str) -> Option<SymbolAddress>;

    /// Unload the module. Called at most once per handle.
    fn close(&self, handle: NativeHandle) -> Result<(), LoadError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "loader"
    }

    /// Whether paths name files on disk. Load policy only applies when true.
    fn file_backed(&self) -> bool {
        true
    }
}

/// Check if a file has the platform's shared library extension.
pub fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext == std::env::consts::DLL_EXTENSION)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_handle_roundtrip() {
        let handle = NativeHandle::new(42u64);
        assert_eq!(handle.downcast_ref::<u64>(), Some(&42));
        assert!(handle.downcast_ref::<u32>().is_none());

        let handle = handle.into_inner::<u32>().unwrap_err();
        assert_eq!(handle.into_inner::<u64>().unwrap(), 42);
    }

    #[test]
    fn test_symbol_address_null() {
        assert!(SymbolAddress::new(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn test_is_module_file() {
        #[cfg(target_os = "linux")]
        {
            assert!(is_module_file(Path::new("libwidgets.so")));
            assert!(!is_module_file(Path::new("libwidgets.dylib")));
        }

        #[cfg(target_os = "macos")]
        {
            assert!(is_module_file(Path::new("libwidgets.dylib")));
            assert!(!is_module_file(Path::new("libwidgets.so")));
        }

        #[cfg(windows)]
        {
            assert!(is_module_file(Path::new("widgets.dll")));
            assert!(!is_module_file(Path::new("widgets.so")));
        }

        assert!(!is_module_file(Path::new("widgets")));
    }
}
