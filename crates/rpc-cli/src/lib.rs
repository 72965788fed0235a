//! Shared plumbing for the bus-rpc binaries.
//!
//! The binaries themselves live under `src/bin/`; this crate holds the flag
//! definitions and logging bootstrap they have in common.

pub mod flags;
pub mod telemetry;
