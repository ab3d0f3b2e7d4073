//! Typed values and their stored representation
//!
//! Callers work with [`Value`]; the store only ever sees [`RawValue`], where
//! scalars are strings and aggregates are lists or sets of strings.

use crate::coerce::Coercion;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// A single element: what a string key holds, or one item of an aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A value that can be written to or read from the store
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(Scalar),
    /// Ordered sequence, stored as a store list
    List(Vec<Scalar>),
    /// Unordered collection, stored as a store set
    Set(Vec<Scalar>),
}

/// Stored representation of a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    List(Vec<String>),
    Set(Vec<String>),
}

impl Scalar {
    /// Serialized form used in the store
    pub fn to_stored(&self) -> String {
        match self {
            Scalar::Str(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            // Debug keeps a fractional part or exponent ("1.0", "1e21")
            Scalar::Float(f) => format!("{f:?}"),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "string",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "boolean",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_stored())
    }
}

impl Value {
    /// Convert into the representation written to the store.
    /// Duplicate set members collapse to their first occurrence.
    pub fn to_raw(&self) -> RawValue {
        match self {
            Value::Scalar(s) => RawValue::Text(s.to_stored()),
            Value::List(items) => RawValue::List(items.iter().map(Scalar::to_stored).collect()),
            Value::Set(items) => {
                let mut seen = HashSet::with_capacity(items.len());
                RawValue::Set(
                    items
                        .iter()
                        .map(Scalar::to_stored)
                        .filter(|s| seen.insert(s.clone()))
                        .collect(),
                )
            }
        }
    }

    /// Rebuild a value from its stored form. With a coercion target every
    /// scalar must parse, otherwise the whole read is `None`.
    pub fn from_raw(raw: RawValue, coerce_to: Option<Coercion>) -> Option<Value> {
        let coercion = coerce_to.unwrap_or(Coercion::Str);
        let convert = |items: Vec<String>| -> Option<Vec<Scalar>> {
            items.iter().map(|item| coercion.apply(item)).collect()
        };

        match raw {
            RawValue::Text(text) => coercion.apply(&text).map(Value::Scalar),
            RawValue::List(items) => convert(items).map(Value::List),
            RawValue::Set(items) => convert(items).map(Value::Set),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(s) => s.type_name(),
            Value::List(_) => "list",
            Value::Set(_) => "set",
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_int)
    }

    pub fn as_float(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_float)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    /// Elements of a list or set
    pub fn items(&self) -> Option<&[Scalar]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            Value::Scalar(_) => None,
        }
    }
}

// Sets compare by membership, everything else structurally
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                let left: BTreeSet<String> = a.iter().map(Scalar::to_stored).collect();
                let right: BTreeSet<String> = b.iter().map(Scalar::to_stored).collect();
                left == right
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::List(items) | Value::Set(items) => {
                let parts: Vec<String> = items.iter().map(Scalar::to_stored).collect();
                let (open, close) = if matches!(self, Value::List(_)) {
                    ("[", "]")
                } else {
                    ("{", "}")
                };
                write!(f, "{open}{}{close}", parts.join(", "))
            }
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from($v: $ty) -> Self {
                    $body
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

scalar_from! {
    String => |v| Scalar::Str(v),
    &str => |v| Scalar::Str(v.to_string()),
    &String => |v| Scalar::Str(v.clone()),
    i64 => |v| Scalar::Int(v),
    i32 => |v| Scalar::Int(i64::from(v)),
    u32 => |v| Scalar::Int(i64::from(v)),
    f64 => |v| Scalar::Float(v),
    f32 => |v| Scalar::Float(f64::from(v)),
    bool => |v| Scalar::Bool(v),
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// Fixed-length sequences (tuples of one type) store like lists
impl<T: Into<Scalar>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>> From<HashSet<T>> for Value {
    fn from(items: HashSet<T>) -> Self {
        Value::Set(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>> From<BTreeSet<T>> for Value {
    fn from(items: BTreeSet<T>) -> Self {
        Value::Set(items.into_iter().map(Into::into).collect())
    }
}
