//! The type-erased container that crosses the module boundary.
//!
//! An adapter returns a `*mut c_void` that points to a boxed
//! [`TransferEnvelope`]. The importer reads the protocol version first,
//! then takes the box back and extracts the payload by attempted downcast,
//! never by reinterpreting the pointer as the requested type.

use std::any::Any;
use std::ffi::c_void;

use crate::error::ExportError;
use crate::packed::{ExportedBox, PackedPointer};

/// Current envelope protocol version.
///
/// Bumped whenever the layout of [`TransferEnvelope`] or [`Payload`] changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Boxed value or error travelling from an exporter to an importer.
///
/// `protocol_version` is the first field of a `repr(C)` struct so an
/// importer built against another SDK version can still read it.
#[repr(C)]
pub struct TransferEnvelope {
    protocol_version: u32,
    payload: Payload,
}

/// Contents of a [`TransferEnvelope`]. Exactly one variant is populated.
pub enum Payload {
    /// A `PackedPointer<T>` erased behind `dyn Any`, plus the exporter's
    /// name for `T` (for diagnostics only).
    Value {
        packed: Box<dyn Any>,
        type_name: &'static str,
    },
    Error(ExportError),
}

/// Outcome of extracting a typed value from an envelope.
#[derive(Debug)]
pub enum Extracted<T: 'static> {
    Value(ExportedBox<T>),
    Error(ExportError),
    /// The envelope held a value of another type. That value has already
    /// been destroyed with its exporter's deleter.
    TypeMismatch { found: String },
}

impl TransferEnvelope {
    /// Wrap a freshly created value.
    pub fn value<T: 'static>(value: Box<T>) -> Self {
        Self::packed(PackedPointer::new(value))
    }

    /// Wrap an already packed value.
    pub fn packed<T: 'static>(packed: PackedPointer<T>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            payload: Payload::Value {
                packed: Box::new(packed),
                type_name: std::any::type_name::<T>(),
            },
        }
    }

    pub fn error(error: ExportError) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            payload: Payload::Error(error),
        }
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, Payload::Error(_))
    }

    /// Box the envelope and hand it across the boundary.
    pub fn into_raw(self) -> *mut c_void {
        Box::into_raw(Box::new(self)) as *mut c_void
    }

    /// Read the protocol version of an envelope without taking ownership.
    ///
    /// # Safety
    ///
    /// `raw` must be non-null and point to an envelope produced by an
    /// adapter (of any SDK version that keeps the version at offset 0).
    pub unsafe fn peek_protocol_version(raw: *const c_void) -> u32 {
        unsafe { std::ptr::read(raw as *const u32) }
    }

    /// Take back ownership of an envelope produced by [`into_raw`].
    ///
    /// # Safety
    ///
    /// `raw` must come from [`TransferEnvelope::into_raw`] with the same
    /// protocol version, and must not be used again afterwards.
    ///
    /// [`into_raw`]: TransferEnvelope::into_raw
    pub unsafe fn from_raw(raw: *mut c_void) -> Box<Self> {
        unsafe { Box::from_raw(raw as *mut Self) }
    }

    /// Extract a `T`, consuming the envelope.
    ///
    /// On success the deleter is disarmed and ownership moves to the
    /// returned [`ExportedBox`]. In every case the envelope itself is
    /// released exactly once.
    pub fn extract<T: 'static>(self) -> Extracted<T> {
        match self.payload {
            Payload::Error(error) => Extracted::Error(error),
            Payload::Value { packed, type_name } => {
                match packed.downcast::<PackedPointer<T>>() {
                    Ok(packed) => Extracted::Value(packed.unpack()),
                    Err(other) => {
                        drop(other);
                        Extracted::TypeMismatch {
                            found: type_name.to_string(),
                        }
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TransferEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("TransferEnvelope");
        s.field("protocol_version", &self.protocol_version);
        match &self.payload {
            Payload::Value { type_name, .. } => s.field("value", type_name),
            Payload::Error(error) => s.field("error", &error.message),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static WIDGET_DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    struct Widget {
        id: u32,
    }

    impl Drop for Widget {
        fn drop(&mut self) {
            WIDGET_DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct Gadget;

    #[derive(Debug)]
    struct Sprocket {
        teeth: u32,
    }

    #[test]
    fn test_extract_matching_type() {
        let envelope = TransferEnvelope::value(Box::new(42u64));
        assert_eq!(envelope.protocol_version(), PROTOCOL_VERSION);

        match envelope.extract::<u64>() {
            Extracted::Value(v) => assert_eq!(*v, 42),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_extract_wrong_type_destroys_value() {
        let before = WIDGET_DROPS.load(Ordering::SeqCst);
        let envelope = TransferEnvelope::value(Box::new(Widget { id: 3 }));

        match envelope.extract::<Gadget>() {
            Extracted::TypeMismatch { found } => assert!(found.ends_with("Widget")),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(WIDGET_DROPS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_payload_reports_exporter_type() {
        let envelope = TransferEnvelope::value(Box::new(Sprocket { teeth: 4 }));
        match envelope.payload() {
            Payload::Value { type_name, .. } => assert!(type_name.ends_with("Sprocket")),
            Payload::Error(e) => panic!("unexpected error: {}", e),
        }
        assert!(format!("{:?}", envelope).contains("Sprocket"));
    }

    #[test]
    fn test_extract_error() {
        let envelope = TransferEnvelope::error(ExportError::returned_null());
        assert!(envelope.is_error());
        assert!(matches!(envelope.payload(), Payload::Error(e) if e.message == "returned null pointer"));

        match envelope.extract::<Widget>() {
            Extracted::Error(e) => assert_eq!(e.message, "returned null pointer"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_raw_crossing() {
        let raw = TransferEnvelope::value(Box::new(Sprocket { teeth: 9 })).into_raw();
        assert!(!raw.is_null());

        let version = unsafe { TransferEnvelope::peek_protocol_version(raw) };
        assert_eq!(version, PROTOCOL_VERSION);

        let envelope = unsafe { TransferEnvelope::from_raw(raw) };
        match envelope.extract::<Sprocket>() {
            Extracted::Value(s) => assert_eq!(s.teeth, 9),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
