//! dynbridge SDK
//!
//! Shared half of the dynbridge transfer protocol. Exporting modules use it
//! to hand values to a host; the host (`dynbridge`) uses the same types to
//! take them back.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dynbridge_sdk::export_safe;
//!
//! pub struct Widget {
//!     pub name: String,
//! }
//!
//! fn make_widget() -> Box<Widget> {
//!     Box::new(Widget { name: "gear".to_string() })
//! }
//!
//! export_safe!(make_widget as "MakeWidget");
//! ```
//!
//! The host then calls `controller.call_safe::<Widget>("MakeWidget")`.
//! Both sides must be built with the same version of this crate and the
//! same compiler, since the envelope is a Rust type.

pub mod adapter;
pub mod envelope;
pub mod error;
#[macro_use]
pub mod macros;
pub mod packed;
pub mod symbol;

pub use adapter::{run_factory, FactoryOutcome, FactoryOutput, SafeAdapterFn};
pub use envelope::{Extracted, Payload, TransferEnvelope, PROTOCOL_VERSION};
pub use error::ExportError;
pub use packed::{Deleter, ExportedBox, PackedPointer};
pub use symbol::{logical_name, safe_symbol_name, SAFE_SYMBOL_SUFFIX};

/// Prelude module with common imports for exporting modules
pub mod prelude {
    pub use crate::adapter::{run_factory, FactoryOutput};
    pub use crate::error::ExportError;
    pub use crate::export_safe;
}
