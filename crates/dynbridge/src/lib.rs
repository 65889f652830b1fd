//! dynbridge
//!
//! Import functions and typed values from dynamically loaded modules
//! without outliving the module that owns their code.
//!
//! Every [`ImportedFunction`] and [`ImportedObject`] holds a share of its
//! module's [`LibraryHandle`]. The module is unloaded when the last share
//! drops, never earlier.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dynbridge::prelude::*;
//!
//! let controller = ImportController::create("modules/libwidgets.so")?;
//!
//! // Type-checked import through a safe export.
//! let widget = controller.call_safe::<Widget>("MakeWidget")?;
//!
//! // Unchecked import of a plain C function.
//! let add = unsafe { controller.get_function::<extern "C" fn(i32, i32) -> i32>("add")? };
//! assert_eq!(add.call((1, 2)), 3);
//! ```
//!
//! Exporting modules depend on `dynbridge-sdk` and use
//! [`export_safe!`](dynbridge_sdk::export_safe).

pub mod config;
pub mod controller;
pub mod error;
pub mod imported;
pub mod library;
pub mod loader;

pub use config::{BridgeConfig, LoadPolicy, MODULE_DIR_ENV};
pub use controller::ImportController;
pub use error::{BridgeError, ConfigError, LoadError, Result};
pub use imported::{ForeignFn, ImportedFunction, ImportedObject};
pub use library::{LibraryHandle, LibraryState};
pub use loader::{LoaderPort, ModuleTable, NativeHandle, StaticLoader, SymbolAddress, SystemLoader};

pub use dynbridge_sdk::{
    safe_symbol_name, ExportError, SafeAdapterFn, PROTOCOL_VERSION, SAFE_SYMBOL_SUFFIX,
};

/// Prelude module with common imports for hosts
pub mod prelude {
    pub use crate::config::BridgeConfig;
    pub use crate::controller::ImportController;
    pub use crate::error::{BridgeError, Result};
    pub use crate::imported::{ImportedFunction, ImportedObject};
    pub use crate::loader::{LoaderPort, ModuleTable, StaticLoader, SystemLoader};
}
