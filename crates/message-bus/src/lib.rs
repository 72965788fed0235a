//! # Message Bus - Topic Pub/Sub Transport
//!
//! Fire-and-forget delivery of named messages to topic subscribers. This is
//! the black-box transport the RPC layer sits on: it promises nothing about
//! ordering, deduplication, or delivery, only `publish(topic, bytes, props)`
//! and `subscribe(topic) -> stream of messages`.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Requester   │    publish()       │  Responder   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │ Message Bus  │ ─────────┘
//!                  │              │  subscribe()
//!                  └──────────────┘
//! ```
//!
//! Two implementations:
//!
//! - [`InMemoryBus`] - `tokio::sync::broadcast` fan-out within one process;
//!   used by the integration tests and single-process deployments.
//! - [`TcpBus`] - client for the line-delimited JSON broker in [`broker`];
//!   used by the command-line binaries to span processes.
//!
//! Correlation metadata ([`MessageProperties`]) travels out-of-band from the
//! payload, mirroring transport-level message properties.

pub mod broker;
pub mod frame;
pub mod memory;
pub mod message;
pub mod tcp;
pub mod transport;

pub use broker::{Broker, BrokerError};
pub use memory::InMemoryBus;
pub use message::{BusMessage, MessageProperties};
pub use tcp::TcpBus;
pub use transport::{Subscription, Transport, TransportError};

/// Maximum messages buffered per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
