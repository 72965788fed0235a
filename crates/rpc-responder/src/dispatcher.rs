//! Server-side dispatch loop.

use crate::registry::{Handler, HandlerRegistry, Outcome};
use crate::shutdown::ShutdownSignal;
use futures::FutureExt;
use message_bus::{BusMessage, MessageProperties, Transport, TransportError};
use rpc_core::{Request, Response};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Receives calls from the request topic, routes them to handlers, and
/// publishes correlated replies.
///
/// The serve loop has no terminal state reachable from normal operation;
/// it ends only when the transport is gone or the enclosing process exits.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    transport: Arc<dyn Transport>,
    shutdown: ShutdownSignal,
}

impl Dispatcher {
    /// Create a dispatcher over an already-built registry.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        transport: Arc<dyn Transport>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            registry,
            transport,
            shutdown,
        }
    }

    /// Subscribe to the request topic and serve calls until the
    /// subscription closes.
    ///
    /// Each inbound call is dispatched as an independent task, so slow
    /// handlers never block the loop, and one call's reply can never
    /// interleave with another's: invocation and reply publication for a
    /// call happen inside its own task.
    pub async fn serve(&self, request_topic: &str) -> Result<(), TransportError> {
        let mut subscription = self.transport.subscribe(request_topic).await?;
        info!(
            request_topic = %request_topic,
            handlers = self.registry.len(),
            "Dispatcher serving"
        );

        while let Some(message) = subscription.recv().await {
            if !message.properties.is_rpc_call() {
                debug!(topic = %message.topic, "Ignoring non-RPC message");
                continue;
            }
            let registry = Arc::clone(&self.registry);
            let transport = Arc::clone(&self.transport);
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                dispatch(registry, transport, shutdown, message).await;
            });
        }

        info!(request_topic = %request_topic, "Request subscription closed");
        Ok(())
    }
}

/// Handle one inbound call end to end: decode, resolve, invoke, reply.
async fn dispatch(
    registry: Arc<HandlerRegistry>,
    transport: Arc<dyn Transport>,
    shutdown: ShutdownSignal,
    message: BusMessage,
) {
    // Presence of both was checked before the task was spawned.
    let (Some(correlation_id), Some(reply_topic)) = (
        message.properties.correlation_id,
        message.properties.reply_topic,
    ) else {
        return;
    };

    let request = match Request::from_bytes(&message.payload) {
        Ok(r) => r,
        Err(e) => {
            // No semantic reply is possible; the caller will time out.
            warn!(
                correlation_id = %correlation_id,
                error = %e,
                "Discarding request that could not be decoded"
            );
            return;
        }
    };
    debug!(
        correlation_id = %correlation_id,
        function = %request.function,
        "Dispatching request"
    );

    let outcome = match registry.resolve(&request.function) {
        Some(handler) => invoke(handler.as_ref(), &request).await,
        None => {
            warn!(function = %request.function, "Handler not found");
            Outcome::reply(Response::bad_request(format!(
                "handler not found: {}",
                request.function
            )))
        }
    };

    let payload = match outcome.response.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(
                correlation_id = %correlation_id,
                error = %e,
                "Failed to encode reply"
            );
            return;
        }
    };
    let reply = BusMessage::new(reply_topic.clone(), payload)
        .with_properties(MessageProperties::reply(correlation_id.clone()));
    if let Err(e) = transport.publish(reply).await {
        // The call is lost from our perspective; no retry at this layer.
        error!(
            correlation_id = %correlation_id,
            reply_topic = %reply_topic,
            error = %e,
            "Failed to publish reply"
        );
    }

    if outcome.quit {
        if shutdown.release() {
            info!("Quit served, releasing shutdown signal");
        } else {
            debug!("Quit served, shutdown signal already released");
        }
    }
}

/// Fault boundary around handler invocation.
///
/// A handler `Err` or panic becomes a bad-request reply carrying the fault
/// text, with the quit flag forced false. Nothing a handler does can
/// terminate the dispatcher.
async fn invoke(handler: &dyn Handler, request: &Request) -> Outcome {
    match AssertUnwindSafe(handler.handle(request)).catch_unwind().await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(fault)) => {
            warn!(function = %request.function, error = %fault, "Handler failed");
            Outcome::reply(Response::bad_request(fault.to_string()))
        }
        Err(panic) => {
            let text = panic_text(panic);
            error!(function = %request.function, panic = %text, "Handler panicked");
            Outcome::reply(Response::bad_request(text))
        }
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
