//! Values and functions that keep their module loaded.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use dynbridge_sdk::ExportedBox;

use crate::library::LibraryHandle;
use crate::loader::SymbolAddress;

/// An `extern "C"` function pointer type that can be imported by name.
///
/// Implemented for `extern "C" fn(A, B, ..) -> R` with up to six arguments.
pub trait ForeignFn: Copy + Send + Sync + 'static {
    /// Argument tuple.
    type Args;
    type Output;

    /// Reinterpret a resolved address as this function type.
    ///
    /// # Safety
    ///
    /// `address` must point to a function with exactly this signature.
    unsafe fn from_address(address: SymbolAddress) -> Self;

    fn invoke(self, args: Self::Args) -> Self::Output;
}

macro_rules! impl_foreign_fn {
    ($($arg:ident: $ty:ident),*) => {
        impl<R: 'static, $($ty: 'static),*> ForeignFn for extern "C" fn($($ty),*) -> R {
            type Args = ($($ty,)*);
            type Output = R;

            unsafe fn from_address(address: SymbolAddress) -> Self {
                // SAFETY: function pointers and data pointers have the same
                // size on every platform with a dynamic loader.
                unsafe { std::mem::transmute_copy::<*mut std::ffi::c_void, Self>(&address.as_ptr()) }
            }

            fn invoke(self, ($($arg,)*): Self::Args) -> R {
                (self)($($arg),*)
            }
        }
    };
}

impl_foreign_fn!();
impl_foreign_fn!(a: A);
impl_foreign_fn!(a: A, b: B);
impl_foreign_fn!(a: A, b: B, c: C);
impl_foreign_fn!(a: A, b: B, c: C, d: D);
impl_foreign_fn!(a: A, b: B, c: C, d: D, e: E);
impl_foreign_fn!(a: A, b: B, c: C, d: D, e: E, f: F);

/// A function imported with
/// [`ImportController::get_function`](crate::ImportController::get_function).
pub struct ImportedFunction<F: ForeignFn> {
    func: F,
    owner: Arc<LibraryHandle>,
}

impl<F: ForeignFn> ImportedFunction<F> {
    pub(crate) fn new(func: F, owner: Arc<LibraryHandle>) -> Self {
        Self { func, owner }
    }

    /// Call the function with a tuple of arguments.
    ///
    /// ```rust,ignore
    /// let add = unsafe { controller.get_function::<extern "C" fn(i32, i32) -> i32>("add")? };
    /// assert_eq!(add.call((2, 3)), 5);
    /// ```
    pub fn call(&self, args: F::Args) -> F::Output {
        self.func.invoke(args)
    }

    /// The module this function lives in.
    pub fn library(&self) -> &LibraryHandle {
        &self.owner
    }
}

impl<F: ForeignFn> Clone for ImportedFunction<F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func,
            owner: Arc::clone(&self.owner),
        }
    }
}

impl<F: ForeignFn> fmt::Debug for ImportedFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedFunction")
            .field("signature", &std::any::type_name::<F>())
            .field("library", &self.owner.path())
            .finish()
    }
}

/// A value produced by a safe export.
///
/// Dereferences to `T`. Dropping it destroys the value with the exporting
/// module's deleter, then releases this object's hold on the module.
pub struct ImportedObject<T: 'static> {
    // Drop order matters: the value goes before the module.
    value: ExportedBox<T>,
    owner: Arc<LibraryHandle>,
}

impl<T: 'static> ImportedObject<T> {
    pub(crate) fn new(value: ExportedBox<T>, owner: Arc<LibraryHandle>) -> Self {
        Self { value, owner }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// The module this value came from.
    pub fn library(&self) -> &LibraryHandle {
        &self.owner
    }
}

impl<T: 'static> Deref for ImportedObject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: 'static> DerefMut for ImportedObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ImportedObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedObject")
            .field("value", &*self.value)
            .field("library", &self.owner.path())
            .finish()
    }
}
