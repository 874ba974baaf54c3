//! Legacy embedding API generation.
//!
//! This generation predates explicit isolate passing: constructors and scopes
//! operate on the isolate entered on the current thread, and native callbacks
//! *return* their result as a handle. A handle created in a scope is only
//! carried out of it through [`HandleScope::close`].

use crate::handle::{Local, PersistentId, kind};
use crate::isolate::{Isolate, fatal_error};
use crate::value::{Function, FunctionKind, Value};

/// In this generation handles are called `Handle`.
pub type Handle<T = kind::Any> = Local<T>;

/// Native callback signature: the returned handle is the call's result.
pub type InvocationCallback = fn(&Arguments) -> Handle;

/// The isolate entered on this thread. Calling into this generation without
/// an entered isolate is a fatal host error.
#[must_use]
pub fn current_isolate() -> Isolate {
    Isolate::current().unwrap_or_else(|| fatal_error("legacy", "no isolate entered"))
}

/// A handle scope on the current isolate.
pub struct HandleScope {
    isolate: Isolate,
    mark: usize,
    closed: bool,
}

impl HandleScope {
    /// Open a scope on the current isolate.
    #[must_use]
    pub fn new() -> Self {
        let isolate = current_isolate();
        let mark = isolate.handle_mark();
        Self {
            isolate,
            mark,
            closed: false,
        }
    }

    /// Exit the scope, carrying `handle` into the enclosing scope.
    #[must_use]
    pub fn close<T>(mut self, handle: Handle<T>) -> Handle<T> {
        let value = self.isolate.value(handle);
        self.isolate.release_handles(self.mark);
        self.closed = true;
        self.isolate.local(value)
    }
}

impl Default for HandleScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HandleScope {
    fn drop(&mut self) {
        if !self.closed {
            self.isolate.release_handles(self.mark);
        }
    }
}

/// Arguments of a native call.
pub struct Arguments {
    isolate: Isolate,
    first: usize,
    len: usize,
    data: Value,
}

impl Arguments {
    pub(crate) fn new(isolate: Isolate, args: &[Value], data: Value) -> Self {
        let first = isolate.handle_mark();
        for arg in args {
            isolate.push_handle(arg.clone());
        }
        Self {
            isolate,
            first,
            len: args.len(),
            data,
        }
    }

    /// Number of arguments actually passed.
    #[must_use]
    pub fn length(&self) -> usize {
        self.len
    }

    /// Argument `index`, or `undefined` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Handle {
        if index < self.len {
            Local::from_index(self.first.saturating_add(index))
        } else {
            self.isolate.local(Value::Undefined)
        }
    }

    /// The data attached to the function template.
    #[must_use]
    pub fn data(&self) -> Handle {
        self.isolate.local(self.data.clone())
    }
}

/// `undefined` in the current scope.
#[must_use]
pub fn undefined() -> Handle {
    current_isolate().local(Value::Undefined)
}

/// `null` in the current scope.
#[must_use]
pub fn null() -> Handle {
    current_isolate().local(Value::Null)
}

/// Boolean constructor.
pub struct Boolean;

#[allow(clippy::new_ret_no_self)]
impl Boolean {
    #[must_use]
    pub fn new(value: bool) -> Handle<kind::Boolean> {
        current_isolate().local(Value::Boolean(value))
    }
}

/// Integer constructor.
pub struct Integer;

#[allow(clippy::new_ret_no_self)]
impl Integer {
    #[must_use]
    pub fn new(value: i32) -> Handle<kind::Integer> {
        current_isolate().local(Value::Integer(value))
    }
}

/// String constructor.
pub struct String;

#[allow(clippy::new_ret_no_self)]
impl String {
    #[must_use]
    pub fn new(value: &str) -> Handle<kind::String> {
        current_isolate().local(Value::string(value))
    }
}

/// Blueprint for a native function.
pub struct FunctionTemplate {
    callback: InvocationCallback,
    data: Value,
}

impl FunctionTemplate {
    /// Create a template; `data` is handed back to every invocation.
    #[must_use]
    pub fn new(callback: InvocationCallback, data: Handle) -> Self {
        Self {
            callback,
            data: current_isolate().value(data),
        }
    }

    /// Instantiate the function in the current scope.
    #[must_use]
    pub fn get_function(&self) -> Handle<kind::Function> {
        let function = Function::native(FunctionKind::Legacy(self.callback), self.data.clone());
        current_isolate().local(Value::Function(function))
    }
}

/// A handle that outlives handle scopes until disposed.
pub struct Persistent<T> {
    id: Option<PersistentId>,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T> Persistent<T> {
    /// Promote `handle` to a persistent handle.
    #[must_use]
    pub fn new(handle: Handle<T>) -> Self {
        let isolate = current_isolate();
        let id = isolate.persist(isolate.value(handle));
        Self {
            id: Some(id),
            _kind: std::marker::PhantomData,
        }
    }

    /// A scoped handle to the same value.
    #[must_use]
    pub fn handle(&self) -> Handle<T> {
        let isolate = current_isolate();
        let value = self
            .id
            .map(|id| isolate.persistent_value(id))
            .unwrap_or_default();
        isolate.local(value)
    }

    /// Release the slot. Disposing twice is a no-op.
    pub fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            current_isolate().release_persistent(id);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}

/// Schedule `exception` to be thrown when the native call returns.
/// The returned handle is `undefined` and is meant to be returned directly.
#[must_use]
pub fn throw_exception(exception: Value) -> Handle {
    let isolate = current_isolate();
    isolate.set_pending_exception(exception);
    isolate.local(Value::Undefined)
}

/// Hint that the embedder is short on memory.
pub fn low_memory_notification() {
    current_isolate().notify_low_memory();
}
