//! # RPC Core - Envelope Types and Wire Codec
//!
//! Transport-independent data model for the bus-rpc protocol:
//!
//! - [`Args`] - a string-keyed container of dynamically typed values,
//!   shared by request arguments and response fields
//! - [`Request`] / [`Response`] - the two envelope shapes carried on the wire
//! - [`BuildInfo`] - build metadata served by the `buildinfo` handler
//!
//! ## Wire Format
//!
//! Envelopes are text-encoded JSON objects:
//!
//! ```text
//! Request:  {"function": "calculator", "args": {"operation": "add", ...}}
//! Response: {"code": 200, "result": 7}
//! ```
//!
//! Correlation metadata (token, reply topic) is NOT part of the envelope;
//! it travels as transport message properties (see the `message-bus` crate).
//!
//! ## Numeric Model
//!
//! Integers are transported as double-precision floats and rounded on read.
//! See [`Args::get_integer`] for the exact rounding rule.

pub mod args;
pub mod buildinfo;
pub mod envelope;

pub use args::{ArgValue, Args, ArgsError};
pub use buildinfo::BuildInfo;
pub use envelope::{code, CodecError, Request, Response};
