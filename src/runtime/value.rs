//! The dynamic value exchanged with a runtime backend.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A Python value after it left the interpreter.
///
/// Containers keep their Python shape so that `Unknown` results can be
/// inspected without a static type. Dicts and sets are kept as lists since
/// their elements need not be hashable on the Rust side.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    Set(Vec<Value>),
    /// Anything else, held by the backend and handed back untouched.
    Object(OpaqueObject),
}

impl Value {
    /// Python type name, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::Object(_) => "object",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

/// Backend-owned object. Equality is identity.
#[derive(Clone)]
pub struct OpaqueObject(Arc<dyn Any + Send + Sync>);

impl OpaqueObject {
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        OpaqueObject(Arc::new(object))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for OpaqueObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OpaqueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueObject({:p})", Arc::as_ptr(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_objects_compare_by_identity() {
        let a = OpaqueObject::new(5_u32);
        let b = OpaqueObject::new(5_u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert_eq!(a.downcast_ref::<i64>(), None);
    }
}
