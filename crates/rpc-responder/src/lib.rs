//! # RPC Responder - Server Side of bus-rpc
//!
//! Receives calls from the request topic, routes them to handlers by name,
//! and publishes correlated replies.
//!
//! ## Dispatch Flow
//!
//! ```text
//! inbound message
//!      │  missing token or reply topic? → not RPC, ignored
//!      ▼
//!   Decoding ── malformed? → logged, dropped (caller times out)
//!      ▼
//!   Resolving ── unknown function? → 400 "handler not found: <name>"
//!      ▼
//!   Invoking ── fault boundary: panic or Err becomes a 400 reply,
//!      │         quit flag forced false
//!      ▼
//!   Replying ── publish to the call's reply topic with its token;
//!      │         publish failure is logged, the call is lost
//!      ▼
//!   quit flag set? → release the shutdown signal (idempotent)
//! ```
//!
//! Each inbound call runs as an independent task; the registry (immutable
//! after startup) and the transport are the only shared state. All handler
//! failures become data - a non-200 response - and never terminate the
//! serving loop.

pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod shutdown;

pub use dispatcher::Dispatcher;
pub use registry::{Handler, HandlerRegistry, HandlerRegistryBuilder, Outcome};
pub use shutdown::ShutdownSignal;
