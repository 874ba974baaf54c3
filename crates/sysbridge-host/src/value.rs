//! Host value space: primitives, objects, functions and opaque externals.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::isolate::Isolate;
use crate::{legacy, modern};

/// Signature of a function implemented by host-side (script) code.
///
/// `Err` carries the thrown exception value.
pub type ScriptFn = dyn Fn(&Isolate, &[Value]) -> Result<Value, Value>;

/// A value living in the host's value space.
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`.
    #[default]
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A 32-bit integer (a number with an exact `i32` representation).
    Integer(i32),
    /// Any other number.
    Number(f64),
    /// An immutable string.
    String(Rc<str>),
    /// A property bag.
    Object(Object),
    /// A callable.
    Function(Function),
    /// Opaque embedder data, never visible as a property value to scripts.
    External(External),
}

impl Value {
    /// Create a string value.
    #[must_use]
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Rc::from(s.as_ref()))
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean(_))
    }

    /// True for both integer and floating point numbers.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Number(_))
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Boolean truth value (`ToBoolean`).
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) | Self::Function(_) | Self::External(_) => true,
        }
    }

    /// Numeric value (`ToNumber`).
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Integer(i) => f64::from(*i),
            Self::Number(n) => *n,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            },
            Self::Undefined | Self::Object(_) | Self::Function(_) | Self::External(_) => f64::NAN,
        }
    }

    /// Wrapping 32-bit integer conversion (`ToInt32`).
    #[must_use]
    pub fn to_int32(&self) -> i32 {
        match self {
            Self::Integer(i) => *i,
            other => number_to_int32(other.to_number()),
        }
    }

    /// String conversion (`ToString`).
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::String(s) => s.to_string(),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Self::External(_) => "[object External]".to_string(),
        }
    }

    /// Borrow the string contents if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_external(&self) -> Option<&External> {
        match self {
            Self::External(e) => Some(e),
            _ => None,
        }
    }
}

fn number_to_int32(n: f64) -> i32 {
    const TWO_32: f64 = 4_294_967_296.0;
    if !n.is_finite() {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    let wrapped = n.trunc().rem_euclid(TWO_32) as u32 as i32;
    wrapped
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n.is_sign_positive() { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{n}")
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{}", number_to_string(*n)),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(o) => o.fmt(f),
            Self::Function(func) => func.fmt(f),
            Self::External(_) => f.write_str("[External]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

/// A shared, mutable property bag.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<BTreeMap<String, Value>>>);

impl Object {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a property; missing properties read as `undefined`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.0.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Property names in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.borrow().iter()).finish()
    }
}

/// How a function is implemented.
pub(crate) enum FunctionKind {
    Script(Box<ScriptFn>),
    Legacy(legacy::InvocationCallback),
    Modern(modern::FunctionCallback),
}

pub(crate) struct FunctionData {
    pub(crate) name: String,
    pub(crate) kind: FunctionKind,
    pub(crate) data: Value,
}

/// A callable host value.
#[derive(Clone)]
pub struct Function(pub(crate) Rc<FunctionData>);

impl Function {
    /// Create a function backed by host-side code.
    #[must_use]
    pub fn script<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Isolate, &[Value]) -> Result<Value, Value> + 'static,
    {
        Self(Rc::new(FunctionData {
            name: name.into(),
            kind: FunctionKind::Script(Box::new(body)),
            data: Value::Undefined,
        }))
    }

    pub(crate) fn native(kind: FunctionKind, data: Value) -> Self {
        Self(Rc::new(FunctionData {
            name: String::new(),
            kind,
            data,
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// True if this function is implemented by a native callback.
    #[must_use]
    pub fn is_native(&self) -> bool {
        !matches!(self.0.kind, FunctionKind::Script(_))
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function {}]", self.0.name)
    }
}

/// Opaque embedder data carried by the host on the embedder's behalf.
#[derive(Clone)]
pub struct External(Rc<dyn Any>);

impl External {
    #[must_use]
    pub fn new<T: 'static>(data: Rc<T>) -> Self {
        Self(data)
    }

    /// Recover the embedder data if it has type `T`.
    #[must_use]
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.0).downcast::<T>().ok()
    }
}

/// Constructors for host exception objects.
pub struct Exception;

impl Exception {
    /// A generic `Error`.
    #[must_use]
    pub fn error(message: &str) -> Value {
        Self::with_name("Error", message)
    }

    /// A `TypeError`.
    #[must_use]
    pub fn type_error(message: &str) -> Value {
        Self::with_name("TypeError", message)
    }

    /// A `RangeError`.
    #[must_use]
    pub fn range_error(message: &str) -> Value {
        Self::with_name("RangeError", message)
    }

    fn with_name(name: &str, message: &str) -> Value {
        let object = Object::new();
        object.set("name", name);
        object.set("message", message);
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_int32_wraps_like_the_host() {
        assert_eq!(Value::Number(4_294_967_301.0).to_int32(), 5);
        assert_eq!(Value::Number(-1.5).to_int32(), -1);
        assert_eq!(Value::Number(2_147_483_648.0).to_int32(), i32::MIN);
        assert_eq!(Value::Number(f64::NAN).to_int32(), 0);
        assert_eq!(Value::string(" 42 ").to_int32(), 42);
        assert_eq!(Value::string("abc").to_int32(), 0);
        assert_eq!(Value::Boolean(true).to_int32(), 1);
        assert_eq!(Value::Undefined.to_int32(), 0);
    }

    #[test]
    fn to_display_string_matches_host_conventions() {
        assert_eq!(Value::Undefined.to_display_string(), "undefined");
        assert_eq!(Value::Null.to_display_string(), "null");
        assert_eq!(Value::Number(1.0).to_display_string(), "1");
        assert_eq!(Value::Number(1.5).to_display_string(), "1.5");
        assert_eq!(Value::Number(f64::INFINITY).to_display_string(), "Infinity");
        assert_eq!(Value::Integer(-7).to_display_string(), "-7");
        assert_eq!(Value::string("hi").to_display_string(), "hi");
    }

    #[test]
    fn object_properties() {
        let o = Object::new();
        assert!(o.get("missing").is_undefined());
        o.set("a", 1);
        assert_eq!(o.get("a").to_int32(), 1);
        assert!(o.has("a"));
        assert_eq!(o.keys(), vec!["a".to_string()]);
        assert!(o.ptr_eq(&o.clone()));
        assert!(!o.ptr_eq(&Object::new()));
    }

    #[test]
    fn external_downcast() {
        let ext = External::new(Rc::new(5_u32));
        assert_eq!(ext.downcast::<u32>().as_deref(), Some(&5));
        assert!(ext.downcast::<String>().is_none());
    }

    #[test]
    fn exception_objects_carry_name_and_message() {
        let e = Exception::type_error("bad");
        let o = e.as_object().unwrap();
        assert_eq!(o.get("name").as_str(), Some("TypeError"));
        assert_eq!(o.get("message").as_str(), Some("bad"));
    }
}
