//! Handles into the isolate's value space.

use std::fmt;
use std::marker::PhantomData;

/// Type markers for [`Local`] handles.
pub mod kind {
    /// Any value.
    #[derive(Debug)]
    pub struct Any;
    /// A boolean.
    #[derive(Debug)]
    pub struct Boolean;
    /// An integer.
    #[derive(Debug)]
    pub struct Integer;
    /// A string.
    #[derive(Debug)]
    pub struct String;
    /// A function.
    #[derive(Debug)]
    pub struct Function;
    /// An object.
    #[derive(Debug)]
    pub struct Object;
}

/// A scoped handle: valid until the handle scope it was created in exits.
///
/// Handles are bound to the thread that owns the isolate.
pub struct Local<T = kind::Any> {
    index: usize,
    _kind: PhantomData<fn() -> T>,
    _thread_bound: PhantomData<*const ()>,
}

impl<T> Local<T> {
    pub(crate) fn from_index(index: usize) -> Self {
        Self {
            index,
            _kind: PhantomData,
            _thread_bound: PhantomData,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.index
    }

    /// Forget the static type of this handle.
    #[must_use]
    pub fn as_any(self) -> Local<kind::Any> {
        Local::from_index(self.index)
    }

    /// Reinterpret this handle. Like the host's own cast this is unchecked:
    /// callers test the value's type first.
    #[must_use]
    pub fn cast<U>(self) -> Local<U> {
        Local::from_index(self.index)
    }
}

impl<T> Clone for Local<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Local<T> {}

impl<T> fmt::Debug for Local<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Local({})", self.index)
    }
}

/// Slot identifier in the isolate's persistent handle table.
///
/// Plain data: it may be sent to other threads, but can only be resolved
/// through the owning isolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistentId(pub(crate) u32);
