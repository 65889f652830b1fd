//! In-process loader for modules linked into the host binary.
//!
//! Hosts that ship some modules built in (or platforms without a dynamic
//! loader) register a [`ModuleTable`] under a virtual path. Everything
//! above the loader, including the envelope protocol, works unchanged.
//! The loader also counts opens and closes, which makes it the instrument
//! of choice for lifecycle tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use dynbridge_sdk::{safe_symbol_name, SafeAdapterFn};
use parking_lot::RwLock;

use super::{LoaderPort, NativeHandle, SymbolAddress};
use crate::error::LoadError;

type CloseHook = Box<dyn Fn(&Path) + Send + Sync>;

/// Symbol table of one built-in module.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    symbols: HashMap<String, SymbolAddress>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw address under an exact symbol name.
    pub fn with_symbol(mut self, name: impl Into<String>, address: SymbolAddress) -> Self {
        self.symbols.insert(name.into(), address);
        self
    }

    /// Register a plain function under its bare name.
    ///
    /// ```rust,ignore
    /// extern "C" fn add(a: i32, b: i32) -> i32 { a + b }
    /// let table = ModuleTable::new().with_function("add", add as *const ());
    /// ```
    pub fn with_function(self, name: impl Into<String>, f: *const ()) -> Self {
        match SymbolAddress::from_fn(f) {
            Some(address) => self.with_symbol(name, address),
            None => self,
        }
    }

    /// Register a safe adapter under `<name>__dynbridge_safe`.
    pub fn with_safe_export(self, name: &str, adapter: SafeAdapterFn) -> Self {
        self.with_function(safe_symbol_name(name), adapter as *const ())
    }

    pub fn get(&self, name: &str) -> Option<SymbolAddress> {
        self.symbols.get(name).copied()
    }

    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Handle produced by [`StaticLoader::open`].
struct StaticModule {
    path: PathBuf,
    table: ModuleTable,
}

/// Loader that serves registered [`ModuleTable`]s.
#[derive(Default)]
pub struct StaticLoader {
    modules: RwLock<HashMap<PathBuf, ModuleTable>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    close_hook: RwLock<Option<CloseHook>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `table` loadable under `path`. Replaces any earlier table.
    pub fn register(&self, path: impl Into<PathBuf>, table: ModuleTable) -> &Self {
        self.modules.write().insert(path.into(), table);
        self
    }

    /// Remove a module. Already opened handles keep their copy of the table.
    pub fn unregister(&self, path: &Path) -> bool {
        self.modules.write().remove(path).is_some()
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.modules.read().contains_key(path)
    }

    /// Invoke `hook` with the module path every time a module is closed.
    pub fn on_close<F>(&self, hook: F)
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        *self.close_hook.write() = Some(Box::new(hook));
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Modules opened and not yet closed.
    pub fn live_modules(&self) -> usize {
        self.open_count().saturating_sub(self.close_count())
    }
}

impl LoaderPort for StaticLoader {
    fn open(&self, path: &Path) -> Result<NativeHandle, LoadError> {
        let table = self
            .modules
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.display().to_string()))?;

        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(NativeHandle::new(StaticModule {
            path: path.to_path_buf(),
            table,
        }))
    }

    fn resolve(&self, handle: &NativeHandle, name: &str) -> Option<SymbolAddress> {
        handle.downcast_ref::<StaticModule>()?.table.get(name)
    }

    fn close(&self, handle: NativeHandle) -> Result<(), LoadError> {
        let module = handle
            .into_inner::<StaticModule>()
            .map_err(|_| LoadError::ForeignHandle)?;

        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.close_hook.read().as_ref() {
            hook(&module.path);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "static"
    }

    fn file_backed(&self) -> bool {
        false
    }
}
