//! Dynamic argument container.
//!
//! An unordered mapping from string key to a dynamically typed value, used
//! both for request arguments and response fields. Typed accessors fail
//! explicitly on a wrong runtime type instead of silently coercing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A single dynamically typed value.
///
/// Exactly one of string, number, or boolean. There is no dedicated integer
/// variant: integers are stored as doubles (the wire format has only one
/// numeric type) and rounded back on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Boolean value.
    Bool(bool),
    /// Numeric value (doubles carry integers on the wire).
    Number(f64),
    /// String value.
    String(String),
}

impl ArgValue {
    /// Runtime type name, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

/// Errors from typed accessors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgsError {
    /// No value is stored at the key.
    #[error("no value for key '{key}'")]
    Missing { key: String },

    /// A value is stored at the key but its runtime type does not match.
    #[error("unexpected type for key '{key}': expected {expected}, found {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// String-keyed container of [`ArgValue`]s.
///
/// Keys are case-sensitive and exact-match only; no ordering is guaranteed.
/// `put_*` always succeeds and overwrites any existing value at the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(HashMap<String, ArgValue>);

impl Args {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a value is stored at the key, regardless of type.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Store a string value.
    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), ArgValue::String(value.into()));
    }

    /// Store an integer value.
    ///
    /// Stored as a double; integers beyond 2^53 lose precision on the wire.
    pub fn put_integer(&mut self, key: impl Into<String>, value: i64) {
        self.0.insert(key.into(), ArgValue::Number(value as f64));
    }

    /// Store a numeric value.
    pub fn put_number(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), ArgValue::Number(value));
    }

    /// Store a boolean value.
    pub fn put_boolean(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), ArgValue::Bool(value));
    }

    fn get(&self, key: &str) -> Result<&ArgValue, ArgsError> {
        self.0.get(key).ok_or_else(|| ArgsError::Missing {
            key: key.to_string(),
        })
    }

    /// Read a string value.
    pub fn get_string(&self, key: &str) -> Result<&str, ArgsError> {
        match self.get(key)? {
            ArgValue::String(s) => Ok(s),
            other => Err(ArgsError::TypeMismatch {
                key: key.to_string(),
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }

    /// Read an integer value.
    ///
    /// Numbers are rounded to the nearest integer; ties round away from
    /// zero (`f64::round` semantics): `4.5 -> 5`, `-4.5 -> -5`.
    pub fn get_integer(&self, key: &str) -> Result<i64, ArgsError> {
        Ok(self.get_number(key)?.round() as i64)
    }

    /// Read a numeric value.
    pub fn get_number(&self, key: &str) -> Result<f64, ArgsError> {
        match self.get(key)? {
            ArgValue::Number(n) => Ok(*n),
            other => Err(ArgsError::TypeMismatch {
                key: key.to_string(),
                expected: "number",
                actual: other.type_name(),
            }),
        }
    }

    /// Read a boolean value.
    pub fn get_boolean(&self, key: &str) -> Result<bool, ArgsError> {
        match self.get(key)? {
            ArgValue::Bool(b) => Ok(*b),
            other => Err(ArgsError::TypeMismatch {
                key: key.to_string(),
                expected: "boolean",
                actual: other.type_name(),
            }),
        }
    }
}
