//! Conversions between Rust values and `Value`.
//!
//! Going in never fails; coming out checks the Python shape and reports a
//! `RuntimeError::Conversion` on mismatch.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::error::RuntimeError;
use super::value::Value;

pub trait ToValue {
    fn to_value(self) -> Value;
}

pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, RuntimeError>;
}

/// Python `bytes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

/// A Python dict whose keys can't be hashed in Rust, in iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairs<K, V>(pub Vec<(K, V)>);

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        Ok(value)
    }
}

impl ToValue for () {
    fn to_value(self) -> Value {
        Value::None
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        match value {
            Value::None => Ok(()),
            other => Err(RuntimeError::conversion("None", &other)),
        }
    }
}

macro_rules! scalar_impls {
    ($($ty:ty => $variant:ident, $name:literal;)+) => {
        $(
            impl ToValue for $ty {
                fn to_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, RuntimeError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(RuntimeError::conversion($name, &other)),
                    }
                }
            }
        )+
    };
}

scalar_impls! {
    bool => Bool, "bool";
    i64 => Int, "int";
    String => Str, "str";
}

impl ToValue for f64 {
    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

/// Python accepts an `int` wherever a `float` is annotated.
impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(RuntimeError::conversion("float", &other)),
        }
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for Bytes {
    fn to_value(self) -> Value {
        Value::Bytes(self.0)
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        match value {
            Value::Bytes(v) => Ok(Bytes(v)),
            other => Err(RuntimeError::conversion("bytes", &other)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn items(value: Value, expected: &str) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items),
        other => Err(RuntimeError::conversion(expected, &other)),
    }
}

fn entries(value: Value) -> Result<Vec<(Value, Value)>, RuntimeError> {
    match value {
        Value::Dict(entries) => Ok(entries),
        other => Err(RuntimeError::conversion("dict", &other)),
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(self) -> Value {
        Value::List(self.into_iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        items(value, "list")?.into_iter().map(T::from_value).collect()
    }
}

impl<T: ToValue> ToValue for HashSet<T> {
    fn to_value(self) -> Value {
        Value::Set(self.into_iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue + Eq + Hash> FromValue for HashSet<T> {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        items(value, "set")?.into_iter().map(T::from_value).collect()
    }
}

impl<K: ToValue, V: ToValue> ToValue for HashMap<K, V> {
    fn to_value(self) -> Value {
        Value::Dict(
            self.into_iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K: ToValue, V: ToValue> ToValue for Pairs<K, V> {
    fn to_value(self) -> Value {
        Value::Dict(
            self.0
                .into_iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }
}

impl<K: FromValue, V: FromValue> FromValue for Pairs<K, V> {
    fn from_value(value: Value) -> Result<Self, RuntimeError> {
        entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect::<Result<_, _>>()
            .map(Pairs)
    }
}

macro_rules! tuple_impls {
    ($len:literal => $($name:ident $idx:tt),+) => {
        impl<$($name: ToValue),+> ToValue for ($($name,)+) {
            fn to_value(self) -> Value {
                Value::Tuple(vec![$(self.$idx.to_value()),+])
            }
        }

        impl<$($name: FromValue),+> FromValue for ($($name,)+) {
            fn from_value(value: Value) -> Result<Self, RuntimeError> {
                let items = match value {
                    Value::Tuple(items) | Value::List(items) => items,
                    other => return Err(RuntimeError::conversion("tuple", &other)),
                };
                if items.len() != $len {
                    return Err(RuntimeError::Conversion {
                        expected: format!("tuple of {}", $len),
                        found: format!("tuple of {}", items.len()),
                    });
                }
                let mut items = items.into_iter();
                let mut next = || items.next().unwrap_or(Value::None);
                Ok(($(<$name as FromValue>::from_value(next())?,)+))
            }
        }
    };
}

tuple_impls!(1 => A 0);
tuple_impls!(2 => A 0, B 1);
tuple_impls!(3 => A 0, B 1, C 2);
tuple_impls!(4 => A 0, B 1, C 2, D 3);
tuple_impls!(5 => A 0, B 1, C 2, D 3, E 4);
tuple_impls!(6 => A 0, B 1, C 2, D 3, E 4, F 5);
tuple_impls!(7 => A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_impls!(8 => A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
