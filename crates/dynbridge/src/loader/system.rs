//! OS dynamic loader backed by `libloading`.

use std::ffi::c_void;
use std::path::Path;

use libloading::{Library, Symbol};

use super::{LoaderPort, NativeHandle, SymbolAddress};
use crate::error::LoadError;

/// Loads `.so` / `.dylib` / `.dll` files through the platform loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl SystemLoader {
    pub fn new() -> Self {
        Self
    }
}

impl LoaderPort for SystemLoader {
    fn open(&self, path: &Path) -> Result<NativeHandle, LoadError> {
        // SAFETY: loading runs the module's initializers. Trusting the module
        // is the caller's decision; the path has passed the load policy.
        let library = unsafe { Library::new(path) }?;
        Ok(NativeHandle::new(library))
    }

    fn resolve(&self, handle: &NativeHandle, name: &str) -> Option<SymbolAddress> {
        let library = handle.downcast_ref::<Library>()?;

        // SAFETY: only the address is read; nothing is called here.
        let symbol: Symbol<*mut c_void> = unsafe { library.get(name.as_bytes()) }.ok()?;
        SymbolAddress::new(*symbol)
    }

    fn close(&self, handle: NativeHandle) -> Result<(), LoadError> {
        let library = handle
            .into_inner::<Library>()
            .map_err(|_| LoadError::ForeignHandle)?;
        library.close()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "system"
    }
}
