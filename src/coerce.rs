//! Read-side type coercion
//!
//! The store keeps every scalar as a string. A [`Coercion`] names the type a
//! caller wants back; parsing failures yield `None` so a wrongly typed key
//! reads exactly like a missing one.

use crate::error::{Result, TtlKvError};
use crate::value::Scalar;
use std::fmt;
use std::str::FromStr;

/// Target type for values read back from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coercion {
    Str,
    Int,
    Float,
    Bool,
}

impl Coercion {
    /// Parse one stored scalar into the target type
    pub fn apply(&self, raw: &str) -> Option<Scalar> {
        match self {
            Coercion::Str => Some(Scalar::Str(raw.to_string())),
            Coercion::Int => raw.trim().parse::<i64>().ok().map(Scalar::Int),
            Coercion::Float => raw.trim().parse::<f64>().ok().map(Scalar::Float),
            Coercion::Bool => parse_bool(raw.trim()).map(Scalar::Bool),
        }
    }

    /// Canonical keyword for this target
    pub fn keyword(&self) -> &'static str {
        match self {
            Coercion::Str => "str",
            Coercion::Int => "int",
            Coercion::Float => "float",
            Coercion::Bool => "bool",
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Some(false)
    } else {
        None
    }
}

impl FromStr for Coercion {
    type Err = TtlKvError;

    fn from_str(keyword: &str) -> Result<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Ok(Coercion::Str),
            "int" | "integer" => Ok(Coercion::Int),
            "float" | "numeric" | "double" => Ok(Coercion::Float),
            "bool" | "boolean" => Ok(Coercion::Bool),
            _ => Err(TtlKvError::InvalidCoercion {
                keyword: keyword.to_string(),
            }),
        }
    }
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
