//! Cross-crate integration flows.

pub mod broker_flows;
pub mod rpc_flows;
