//! # RPC Requester - Client Side of bus-rpc
//!
//! Issues calls over the message bus and blocks the caller until the
//! correlated reply arrives or a deadline expires.
//!
//! ## Call Flow
//!
//! ```text
//! caller ──→ Requester::call()
//!              │ 1. register pending entry (token → oneshot slot)
//!              │ 2. publish request  (props: token + reply topic)
//!              │ 3. await slot | deadline | cancellation
//!              ▼
//!          reply listener task
//!              │ subscribed to response/<client_id> BEFORE any publish
//!              │ decodes replies, matches token in the pending table
//!              ▼
//!          pending slot resolved → caller unblocked
//! ```
//!
//! Replies with an unknown token (stale: the call already timed out or was
//! cancelled) are discarded. A background sweeper removes expired entries as
//! a backstop for callers that never observe their deadline.

pub mod correlation;
pub mod pending;
pub mod requester;

pub use correlation::CorrelationId;
pub use pending::{PendingCallTable, PendingStats};
pub use requester::{CallError, Requester};
