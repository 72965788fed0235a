//! # bus-rpc Test Suite
//!
//! Unified test crate exercising the whole request/response layer end to
//! end: requester and responder wired to the same bus, real handlers, real
//! correlation.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── rpc_flows.rs     # Requester ↔ responder over the in-memory bus
//!     └── broker_flows.rs  # TCP broker: round trips, auth, fan-out
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rpc-tests
//! ```

pub mod integration;
