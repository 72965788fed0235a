//! Request and response envelopes and their wire codec.
//!
//! Both envelopes serialize to JSON. Decoding tolerates unknown extra
//! fields (forward compatibility) but fails on structurally invalid input:
//! bytes that are not valid JSON, a request without a `function` field, or
//! a container that cannot be parsed into key/typed-value pairs.

use crate::args::{Args, ArgsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response status codes. Semantics mirror HTTP.
pub mod code {
    /// The call succeeded.
    pub const OK: i64 = 200;
    /// Malformed input or handler-detected invalid arguments.
    pub const BAD_REQUEST: i64 = 400;
    /// Internal handler failure.
    pub const INTERNAL_ERROR: i64 = 500;
}

/// Errors from encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not a structurally valid envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// A call envelope: the name of a registered handler plus its arguments.
///
/// Immutable once sent; built with [`Request::new`] and the `put_*` methods
/// before first serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the handler to invoke.
    pub function: String,
    /// Call arguments; may be empty.
    #[serde(default)]
    pub args: Args,
}

impl Request {
    /// Create a request for the named function with no arguments.
    #[must_use]
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Args::new(),
        }
    }

    /// Store a string argument.
    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.args.put_string(key, value);
    }

    /// Store an integer argument.
    pub fn put_integer(&mut self, key: impl Into<String>, value: i64) {
        self.args.put_integer(key, value);
    }

    /// Store a numeric argument.
    pub fn put_number(&mut self, key: impl Into<String>, value: f64) {
        self.args.put_number(key, value);
    }

    /// Store a boolean argument.
    pub fn put_boolean(&mut self, key: impl Into<String>, value: bool) {
        self.args.put_boolean(key, value);
    }

    /// Read a string argument.
    pub fn get_string(&self, key: &str) -> Result<&str, ArgsError> {
        self.args.get_string(key)
    }

    /// Read an integer argument (see [`Args::get_integer`] for rounding).
    pub fn get_integer(&self, key: &str) -> Result<i64, ArgsError> {
        self.args.get_integer(key)
    }

    /// Read a numeric argument.
    pub fn get_number(&self, key: &str) -> Result<f64, ArgsError> {
        self.args.get_number(key)
    }

    /// Read a boolean argument.
    pub fn get_boolean(&self, key: &str) -> Result<bool, ArgsError> {
        self.args.get_boolean(key)
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A reply envelope: a flat field map holding at minimum a `code` field and,
/// on non-success, a `message` field. Handlers add domain fields such as
/// `result` via the `put_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response {
    fields: Args,
}

impl Response {
    /// Create a response with the given status code.
    #[must_use]
    pub fn with_code(status: i64) -> Self {
        let mut fields = Args::new();
        fields.put_integer("code", status);
        Self { fields }
    }

    /// A success response (code 200).
    #[must_use]
    pub fn success() -> Self {
        Self::with_code(code::OK)
    }

    /// A bad-request response (code 400) with an explanatory message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        let mut resp = Self::with_code(code::BAD_REQUEST);
        resp.put_message(message);
        resp
    }

    /// An internal-error response (code 500) with an explanatory message.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        let mut resp = Self::with_code(code::INTERNAL_ERROR);
        resp.put_message(message);
        resp
    }

    /// Whether the status code is 200.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.code().map(|c| c == code::OK).unwrap_or(false)
    }

    /// Read the status code.
    pub fn code(&self) -> Result<i64, ArgsError> {
        self.fields.get_integer("code")
    }

    /// Read the message field.
    pub fn message(&self) -> Result<&str, ArgsError> {
        self.fields.get_string("message")
    }

    /// Set the message field.
    pub fn put_message(&mut self, message: impl Into<String>) {
        self.fields.put_string("message", message);
    }

    /// Store a string field.
    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.put_string(key, value);
    }

    /// Store an integer field.
    pub fn put_integer(&mut self, key: impl Into<String>, value: i64) {
        self.fields.put_integer(key, value);
    }

    /// Store a numeric field.
    pub fn put_number(&mut self, key: impl Into<String>, value: f64) {
        self.fields.put_number(key, value);
    }

    /// Store a boolean field.
    pub fn put_boolean(&mut self, key: impl Into<String>, value: bool) {
        self.fields.put_boolean(key, value);
    }

    /// Read a string field.
    pub fn get_string(&self, key: &str) -> Result<&str, ArgsError> {
        self.fields.get_string(key)
    }

    /// Read an integer field (see [`Args::get_integer`] for rounding).
    pub fn get_integer(&self, key: &str) -> Result<i64, ArgsError> {
        self.fields.get_integer(key)
    }

    /// Read a numeric field.
    pub fn get_number(&self, key: &str) -> Result<f64, ArgsError> {
        self.fields.get_number(key)
    }

    /// Read a boolean field.
    pub fn get_boolean(&self, key: &str) -> Result<bool, ArgsError> {
        self.fields.get_boolean(key)
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
