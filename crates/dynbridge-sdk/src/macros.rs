//! Declarative macros for exporting modules.

/// Literal suffix behind [`SAFE_SYMBOL_SUFFIX`](crate::symbol::SAFE_SYMBOL_SUFFIX).
#[doc(hidden)]
#[macro_export]
macro_rules! __dynbridge_safe_suffix {
    () => {
        "__dynbridge_safe"
    };
}

/// Export a zero-argument factory through the safe transfer protocol.
///
/// Generates an `extern "C"` adapter named `<name>__dynbridge_safe` that
/// runs the factory via [`run_factory`](crate::adapter::run_factory) and
/// returns a boxed [`TransferEnvelope`](crate::envelope::TransferEnvelope).
///
/// Requirements checked at compile time:
/// - the factory takes no arguments
/// - its result implements [`FactoryOutput`](crate::adapter::FactoryOutput)
///   (`*mut T`, `Box<T>`, `Option<Box<T>>`, or a `Result` over those)
///
/// Checked when the adapter runs:
/// - untyped pointers (`*mut c_void`, `*mut ()`) are refused
/// - panics, `Err` results and null results become error envelopes
///
/// # Example
///
/// ```rust,ignore
/// use dynbridge_sdk::export_safe;
///
/// pub struct Widget {
///     pub id: u32,
/// }
///
/// fn make_widget() -> Box<Widget> {
///     Box::new(Widget { id: 1 })
/// }
///
/// // Exported as `make_widget__dynbridge_safe`
/// export_safe!(make_widget);
///
/// // Exported as `MakeWidget__dynbridge_safe`
/// export_safe!(make_widget as "MakeWidget");
/// ```
#[macro_export]
macro_rules! export_safe {
    ($factory:ident) => {
        const _: () = {
            #[export_name = concat!(stringify!($factory), $crate::__dynbridge_safe_suffix!())]
            extern "C" fn __dynbridge_safe_adapter() -> *mut ::std::ffi::c_void {
                $crate::adapter::run_factory($factory)
            }
        };
    };
    ($factory:ident as $name:literal) => {
        const _: () = {
            #[export_name = concat!($name, $crate::__dynbridge_safe_suffix!())]
            extern "C" fn __dynbridge_safe_adapter() -> *mut ::std::ffi::c_void {
                $crate::adapter::run_factory($factory)
            }
        };
    };
}
