//! Handler capability and registry.
//!
//! The registry is built once at startup and read-only while serving; no
//! entries are added, removed, or replaced after the dispatcher starts.

use async_trait::async_trait;
use rpc_core::{Request, Response};
use std::collections::HashMap;
use std::sync::Arc;

/// What a handler produced: the reply plus the continuation signal.
#[derive(Debug)]
pub struct Outcome {
    /// The reply to publish.
    pub response: Response,
    /// Whether the responder should shut down after replying.
    pub quit: bool,
}

impl Outcome {
    /// A reply that keeps the responder running.
    #[must_use]
    pub fn reply(response: Response) -> Self {
        Self {
            response,
            quit: false,
        }
    }

    /// A reply with an explicit continuation signal.
    #[must_use]
    pub fn reply_and_quit(response: Response, quit: bool) -> Self {
        Self { response, quit }
    }
}

/// A named capability mapping a request to an outcome.
///
/// Returning `Err` is reserved for unexpected internal faults; argument
/// problems should be reported as a 400 [`Response`] in an `Ok` outcome.
/// The dispatcher converts both `Err` and panics into 400 replies at its
/// fault boundary, so neither can take down the serving loop.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Request) -> anyhow::Result<Outcome>;
}

/// Immutable mapping from function name to handler.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// A registry with the four standard handlers: `calculator`,
    /// `getPages`, `buildinfo`, and `quit`.
    #[must_use]
    pub fn with_default_handlers() -> Self {
        Self::builder().default_handlers().build()
    }

    /// Look up a handler by function name.
    ///
    /// `None` is a normal outcome the dispatcher reports to the caller as a
    /// bad request; it is never fatal.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Startup-time registry builder.
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistryBuilder {
    /// Register a handler under a function name, replacing any previous
    /// registration of that name.
    #[must_use]
    pub fn handler(mut self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register the four standard handlers.
    #[must_use]
    pub fn default_handlers(self) -> Self {
        use crate::handlers::{BuildInfoHandler, CalculatorHandler, GetPagesHandler, QuitHandler};
        self.handler("calculator", CalculatorHandler)
            .handler("getPages", GetPagesHandler)
            .handler("buildinfo", BuildInfoHandler::new())
            .handler("quit", QuitHandler)
    }

    /// Finish building; the registry is immutable from here on.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
