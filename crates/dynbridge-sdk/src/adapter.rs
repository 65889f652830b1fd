//! Producer-side adapter: turns a zero-argument factory into an envelope.
//!
//! The adapter is what actually runs inside the exporting module when the
//! importer calls a `<name>__dynbridge_safe` symbol. It never lets a panic
//! unwind across the `extern "C"` boundary.

use std::any::{Any, TypeId};
use std::ffi::c_void;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use crate::envelope::TransferEnvelope;
use crate::error::ExportError;
use crate::packed::PackedPointer;

/// Signature of every safe export: no arguments, returns a boxed envelope.
pub type SafeAdapterFn = extern "C" fn() -> *mut c_void;

/// What a factory produced, before it is packed.
pub enum FactoryOutcome<T: 'static> {
    Produced(PackedPointer<T>),
    Null,
    Failed(String),
}

/// Pointer-like results a factory may return.
///
/// Implemented for `*mut T` (which must come from `Box::into_raw`),
/// `Box<T>`, `Option<Box<T>>`, and `Result<R, E>` over any of those.
pub trait FactoryOutput {
    type Target: Any;

    fn into_outcome(self) -> FactoryOutcome<Self::Target>;
}

impl<T: Any> FactoryOutput for *mut T {
    type Target = T;

    fn into_outcome(self) -> FactoryOutcome<T> {
        // SAFETY: documented contract of FactoryOutput for raw pointers.
        match unsafe { PackedPointer::from_raw(self) } {
            Some(packed) => FactoryOutcome::Produced(packed),
            None => FactoryOutcome::Null,
        }
    }
}

impl<T: Any> FactoryOutput for Box<T> {
    type Target = T;

    fn into_outcome(self) -> FactoryOutcome<T> {
        FactoryOutcome::Produced(PackedPointer::new(self))
    }
}

impl<T: Any> FactoryOutput for Option<Box<T>> {
    type Target = T;

    fn into_outcome(self) -> FactoryOutcome<T> {
        match self {
            Some(value) => FactoryOutcome::Produced(PackedPointer::new(value)),
            None => FactoryOutcome::Null,
        }
    }
}

impl<R, E> FactoryOutput for Result<R, E>
where
    R: FactoryOutput,
    E: Display,
{
    type Target = R::Target;

    fn into_outcome(self) -> FactoryOutcome<R::Target> {
        match self {
            Ok(output) => output.into_outcome(),
            Err(e) => FactoryOutcome::Failed(e.to_string()),
        }
    }
}

/// Run a factory and box its result as an envelope.
///
/// This is the body of every adapter generated by
/// [`export_safe!`](crate::export_safe). Call it from a hand-written
/// `extern "C" fn() -> *mut c_void` when the macro does not fit.
pub fn run_factory<F, R>(factory: F) -> *mut c_void
where
    F: FnOnce() -> R,
    R: FactoryOutput,
{
    let envelope = panic::catch_unwind(AssertUnwindSafe(|| build_envelope(factory)))
        .unwrap_or_else(|_| TransferEnvelope::error(ExportError::adapter_failed()));

    panic::catch_unwind(AssertUnwindSafe(|| envelope.into_raw())).unwrap_or(std::ptr::null_mut())
}

fn build_envelope<F, R>(factory: F) -> TransferEnvelope
where
    F: FnOnce() -> R,
    R: FactoryOutput,
{
    if is_untyped::<R::Target>() {
        return TransferEnvelope::error(ExportError::untyped_pointer());
    }

    let output = match panic::catch_unwind(AssertUnwindSafe(factory)) {
        Ok(output) => output,
        Err(payload) => {
            let message = panic_message(&*payload);
            tracing::warn!(reason = %message, "Factory panicked inside export adapter");
            return TransferEnvelope::error(ExportError::new(format!(
                "factory panicked: {}",
                message
            )));
        }
    };

    match output.into_outcome() {
        FactoryOutcome::Produced(packed) => TransferEnvelope::packed(packed),
        FactoryOutcome::Null => TransferEnvelope::error(ExportError::returned_null()),
        FactoryOutcome::Failed(message) => {
            tracing::warn!(reason = %message, "Factory returned an error");
            TransferEnvelope::error(ExportError::new(format!("factory failed: {}", message)))
        }
    }
}

/// Untyped pointers defeat the importer's type check.
fn is_untyped<T: Any>() -> bool {
    let id = TypeId::of::<T>();
    id == TypeId::of::<c_void>() || id == TypeId::of::<()>()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
