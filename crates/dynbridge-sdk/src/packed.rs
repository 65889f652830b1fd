//! Owned pointers whose destructor belongs to the exporting module.
//!
//! A value created inside a module must be destroyed with that module's
//! drop glue and allocator. [`PackedPointer`] captures the deleter at the
//! point of creation, where `T` is monomorphized inside the exporter, and
//! [`ExportedBox`] keeps using that same deleter after ownership has moved
//! to the importer.

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Destructor for a `T` allocated by the module that produced it.
pub type Deleter<T> = unsafe fn(NonNull<T>);

/// Releases a `Box<T>` that was turned into a raw pointer.
///
/// # Safety
///
/// `ptr` must come from `Box::into_raw` and must not be used afterwards.
unsafe fn drop_boxed<T>(ptr: NonNull<T>) {
    drop(unsafe { Box::from_raw(ptr.as_ptr()) });
}

/// A value packed for transfer, still owned by the envelope.
///
/// Dropping a `PackedPointer` runs the deleter. [`PackedPointer::unpack`]
/// disarms it and hands ownership, deleter included, to an [`ExportedBox`].
pub struct PackedPointer<T: 'static> {
    ptr: NonNull<T>,
    deleter: Deleter<T>,
}

impl<T: 'static> PackedPointer<T> {
    /// Pack a boxed value, capturing the deleter for `Box<T>`.
    pub fn new(value: Box<T>) -> Self {
        // SAFETY: Box::into_raw never returns null.
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(value)) };
        Self {
            ptr,
            deleter: drop_boxed::<T>,
        }
    }

    /// Pack a raw pointer produced by `Box::into_raw`.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `raw` must come from `Box::<T>::into_raw` and must not be
    /// owned by anything else.
    pub unsafe fn from_raw(raw: *mut T) -> Option<Self> {
        NonNull::new(raw).map(|ptr| Self {
            ptr,
            deleter: drop_boxed::<T>,
        })
    }

    /// Disarm the deleter and transfer ownership to the caller.
    pub fn unpack(self) -> ExportedBox<T> {
        let packed = ManuallyDrop::new(self);
        ExportedBox {
            ptr: packed.ptr,
            deleter: packed.deleter,
        }
    }
}

impl<T: 'static> Drop for PackedPointer<T> {
    fn drop(&mut self) {
        // SAFETY: the pointer is still owned by this envelope; unpack skips
        // this drop.
        unsafe { (self.deleter)(self.ptr) };
    }
}

impl<T: 'static> fmt::Debug for PackedPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedPointer")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Exclusive owner of a value produced by another module.
///
/// Drops through the exporter's deleter. The deleter's code lives in the
/// exporting module, so an `ExportedBox` must be dropped while that module
/// is still loaded; importers keep it next to a reference to the library.
pub struct ExportedBox<T: 'static> {
    ptr: NonNull<T>,
    deleter: Deleter<T>,
}

// SAFETY: ExportedBox owns its T exclusively, like Box<T>.
unsafe impl<T: Send + 'static> Send for ExportedBox<T> {}
unsafe impl<T: Sync + 'static> Sync for ExportedBox<T> {}

impl<T: 'static> ExportedBox<T> {
    /// Raw pointer to the value. Valid for as long as `self` is.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<T: 'static> Deref for ExportedBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ptr is valid and uniquely owned for the life of self.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: 'static> DerefMut for ExportedBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: &mut self guarantees exclusive access.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: 'static> Drop for ExportedBox<T> {
    fn drop(&mut self) {
        // SAFETY: ownership was transferred out of the envelope exactly once.
        unsafe { (self.deleter)(self.ptr) };
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ExportedBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
