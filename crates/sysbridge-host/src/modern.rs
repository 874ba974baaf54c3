//! Modern embedding API generation.
//!
//! Every constructor takes the isolate explicitly. Native callbacks return
//! nothing; their result is written into the call's [`ReturnValue`] slot, and
//! a handle scope opened inside a callback never has to escape anything.

use std::cell::RefCell;

use crate::handle::{Local, PersistentId, kind};
use crate::isolate::Isolate;
use crate::value::{Function, FunctionKind, Value};

/// Native callback signature: the result goes into the return value slot.
pub type FunctionCallback = fn(&FunctionCallbackInfo);

/// A handle scope on an explicit isolate.
pub struct HandleScope<'i> {
    isolate: &'i Isolate,
    mark: usize,
}

impl<'i> HandleScope<'i> {
    #[must_use]
    pub fn new(isolate: &'i Isolate) -> Self {
        Self {
            isolate,
            mark: isolate.handle_mark(),
        }
    }

    #[must_use]
    pub fn isolate(&self) -> &'i Isolate {
        self.isolate
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.isolate.release_handles(self.mark);
    }
}

/// Arguments, data and result slot of a native call.
pub struct FunctionCallbackInfo {
    isolate: Isolate,
    first: usize,
    len: usize,
    data: Value,
    return_value: RefCell<Value>,
}

impl FunctionCallbackInfo {
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
            return_value: RefCell::new(Value::Undefined),
        }
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.len
    }

    /// Argument `index`, or `undefined` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Local {
        if index < self.len {
            Local::from_index(self.first.saturating_add(index))
        } else {
            self.isolate.local(Value::Undefined)
        }
    }

    /// The data attached to the function template.
    #[must_use]
    pub fn data(&self) -> Local {
        self.isolate.local(self.data.clone())
    }

    #[must_use]
    pub fn get_isolate(&self) -> &Isolate {
        &self.isolate
    }

    /// The slot the call's result is written into. Defaults to `undefined`.
    #[must_use]
    pub fn get_return_value(&self) -> ReturnValue<'_> {
        ReturnValue {
            isolate: &self.isolate,
            slot: &self.return_value,
        }
    }

    pub(crate) fn take_return_value(&self) -> Value {
        self.return_value.take()
    }
}

/// Writer for a native call's result.
pub struct ReturnValue<'a> {
    isolate: &'a Isolate,
    slot: &'a RefCell<Value>,
}

impl ReturnValue<'_> {
    pub fn set<T>(&self, handle: Local<T>) {
        *self.slot.borrow_mut() = self.isolate.value(handle);
    }

    pub fn set_bool(&self, value: bool) {
        *self.slot.borrow_mut() = Value::Boolean(value);
    }

    pub fn set_int32(&self, value: i32) {
        *self.slot.borrow_mut() = Value::Integer(value);
    }

    pub fn set_undefined(&self) {
        *self.slot.borrow_mut() = Value::Undefined;
    }
}

#[must_use]
pub fn undefined(isolate: &Isolate) -> Local {
    isolate.local(Value::Undefined)
}

#[must_use]
pub fn null(isolate: &Isolate) -> Local {
    isolate.local(Value::Null)
}

/// Boolean constructor.
pub struct Boolean;

#[allow(clippy::new_ret_no_self)]
impl Boolean {
    #[must_use]
    pub fn new(isolate: &Isolate, value: bool) -> Local<kind::Boolean> {
        isolate.local(Value::Boolean(value))
    }
}

/// Integer constructor.
pub struct Integer;

#[allow(clippy::new_ret_no_self)]
impl Integer {
    #[must_use]
    pub fn new(isolate: &Isolate, value: i32) -> Local<kind::Integer> {
        isolate.local(Value::Integer(value))
    }
}

/// String constructor.
pub struct String;

#[allow(clippy::new_ret_no_self)]
impl String {
    #[must_use]
    pub fn new_from_utf8(isolate: &Isolate, value: &str) -> Local<kind::String> {
        isolate.local(Value::string(value))
    }
}

/// Blueprint for a native function.
pub struct FunctionTemplate {
    callback: FunctionCallback,
    data: Value,
}

impl FunctionTemplate {
    #[must_use]
    pub fn new(isolate: &Isolate, callback: FunctionCallback, data: Local) -> Self {
        Self {
            callback,
            data: isolate.value(data),
        }
    }

    #[must_use]
    pub fn get_function(&self, isolate: &Isolate) -> Local<kind::Function> {
        let function = Function::native(FunctionKind::Modern(self.callback), self.data.clone());
        isolate.local(Value::Function(function))
    }
}

/// A handle that outlives handle scopes until reset.
pub struct Persistent<T> {
    id: Option<PersistentId>,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T> Persistent<T> {
    #[must_use]
    pub fn new(isolate: &Isolate, handle: Local<T>) -> Self {
        Self {
            id: Some(isolate.persist(isolate.value(handle))),
            _kind: std::marker::PhantomData,
        }
    }

    /// A scoped handle to the same value.
    #[must_use]
    pub fn get(&self, isolate: &Isolate) -> Local<T> {
        let value = self
            .id
            .map(|id| isolate.persistent_value(id))
            .unwrap_or_default();
        isolate.local(value)
    }

    /// Release the slot. Resetting an empty handle is a no-op.
    pub fn reset(&mut self, isolate: &Isolate) {
        if let Some(id) = self.id.take() {
            isolate.release_persistent(id);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }
}

impl Isolate {
    /// Throw `exception` when the current native call returns.
    pub fn throw_exception(&self, exception: Value) -> Local {
        self.set_pending_exception(exception);
        self.local(Value::Undefined)
    }

    /// Hint that the embedder is short on memory.
    pub fn low_memory_notification(&self) {
        self.notify_low_memory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Exception;

    fn concat(info: &FunctionCallbackInfo) {
        let isolate = info.get_isolate();
        let _scope = HandleScope::new(isolate);
        let joined = format!(
            "{}{}",
            isolate.value(info.get(0)).to_display_string(),
            isolate.value(info.get(1)).to_display_string()
        );
        info.get_return_value()
            .set(String::new_from_utf8(isolate, &joined));
    }

    fn fail(info: &FunctionCallbackInfo) {
        info.get_isolate()
            .throw_exception(Exception::type_error("nope"));
    }

    fn data_echo(info: &FunctionCallbackInfo) {
        info.get_return_value().set(info.data());
    }

    #[test]
    fn callbacks_write_into_the_return_slot() {
        let isolate = Isolate::new().unwrap();
        let function = {
            let _scope = HandleScope::new(&isolate);
            let template = FunctionTemplate::new(&isolate, concat, undefined(&isolate));
            isolate.value(template.get_function(&isolate))
        };
        let result = isolate
            .call_function(&function, &[Value::string("a"), Value::Integer(1)])
            .unwrap();
        assert_eq!(result.as_str(), Some("a1"));
        assert_eq!(isolate.handle_count(), 0);
    }

    #[test]
    fn missing_arguments_read_as_undefined() {
        let isolate = Isolate::new().unwrap();
        let function = {
            let _scope = HandleScope::new(&isolate);
            isolate.value(
                FunctionTemplate::new(&isolate, concat, undefined(&isolate))
                    .get_function(&isolate),
            )
        };
        let result = isolate.call_function(&function, &[]).unwrap();
        assert_eq!(result.as_str(), Some("undefinedundefined"));
    }

    #[test]
    fn thrown_exceptions_reach_the_caller() {
        let isolate = Isolate::new().unwrap();
        let function = {
            let _scope = HandleScope::new(&isolate);
            isolate.value(
                FunctionTemplate::new(&isolate, fail, undefined(&isolate)).get_function(&isolate),
            )
        };
        let err = isolate.call_function(&function, &[]).unwrap_err();
        assert_eq!(err.as_object().unwrap().get("name").as_str(), Some("TypeError"));
    }

    #[test]
    fn template_data_is_passed_to_every_call() {
        let isolate = Isolate::new().unwrap();
        let function = {
            let _scope = HandleScope::new(&isolate);
            let data = String::new_from_utf8(&isolate, "payload").as_any();
            isolate.value(FunctionTemplate::new(&isolate, data_echo, data).get_function(&isolate))
        };
        for _ in 0..2 {
            let result = isolate.call_function(&function, &[]).unwrap();
            assert_eq!(result.as_str(), Some("payload"));
        }
    }

    #[test]
    fn persistent_reset_releases_the_slot() {
        let isolate = Isolate::new().unwrap();
        let mut persistent = {
            let _scope = HandleScope::new(&isolate);
            Persistent::new(&isolate, Integer::new(&isolate, 9))
        };
        assert_eq!(isolate.persistent_count(), 1);
        {
            let _scope = HandleScope::new(&isolate);
            assert_eq!(isolate.value(persistent.get(&isolate)).to_int32(), 9);
        }
        persistent.reset(&isolate);
        persistent.reset(&isolate);
        assert!(persistent.is_empty());
        assert_eq!(isolate.persistent_count(), 0);
    }
}
