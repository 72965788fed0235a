//! Requester: issues calls and blocks until the correlated reply arrives.

use crate::pending::PendingCallTable;
use crate::CorrelationId;
use message_bus::{BusMessage, MessageProperties, Subscription, Transport, TransportError};
use rpc_core::{CodecError, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often the backstop sweeper drops expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Errors returned to the issuer of a call. Never transmitted on the wire.
#[derive(Debug, Error)]
pub enum CallError {
    /// No reply arrived before the deadline.
    #[error("call '{function}' timed out after {timeout:?}")]
    Timeout { function: String, timeout: Duration },

    /// The caller's cancellation fired while the call was pending.
    #[error("call '{function}' was cancelled")]
    Cancelled { function: String },

    /// The request could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The transport rejected the publish or subscribe.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Client-side endpoint issuing calls over the bus.
///
/// One requester owns one reply topic (`response/<client_id>`) and one
/// pending-call table; any number of tasks may issue calls through it
/// concurrently.
pub struct Requester {
    transport: Arc<dyn Transport>,
    request_topic: String,
    reply_topic: String,
    pending: Arc<PendingCallTable>,
    shutdown: CancellationToken,
}

impl Requester {
    /// Connect a requester to the bus.
    ///
    /// Subscribes to the reply topic and starts the reply listener before
    /// returning, so no call can be published before its reply channel is
    /// in place (a fast responder's reply would otherwise be missed).
    pub async fn connect(
        transport: Arc<dyn Transport>,
        request_topic: impl Into<String>,
        client_id: &str,
    ) -> Result<Self, CallError> {
        let reply_topic = format!("response/{client_id}");
        let subscription = transport.subscribe(&reply_topic).await?;

        let pending = Arc::new(PendingCallTable::new());
        let shutdown = CancellationToken::new();

        tokio::spawn(reply_listener(
            subscription,
            Arc::clone(&pending),
            shutdown.clone(),
        ));
        tokio::spawn(sweeper(Arc::clone(&pending), shutdown.clone()));

        info!(reply_topic = %reply_topic, "Requester connected");
        Ok(Self {
            transport,
            request_topic: request_topic.into(),
            reply_topic,
            pending,
            shutdown,
        })
    }

    /// The reply topic this requester listens on.
    #[must_use]
    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    /// Number of calls currently in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    /// Issue a call and block until the reply arrives or `timeout` elapses.
    pub async fn call(&self, request: Request, timeout: Duration) -> Result<Response, CallError> {
        self.call_with_cancel(request, timeout, &CancellationToken::new())
            .await
    }

    /// Issue a call that can additionally be cancelled by the caller.
    ///
    /// Whichever of reply, deadline, or cancellation fires first resolves
    /// the call; the pending entry is removed in all three cases, and
    /// cancelling one call never affects another.
    pub async fn call_with_cancel(
        &self,
        request: Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Response, CallError> {
        let payload = request.to_bytes()?;
        let function = request.function.clone();
        let (correlation_id, mut rx) = self.pending.register(&function, timeout);

        let message = BusMessage::new(&self.request_topic, payload).with_properties(
            MessageProperties::call(correlation_id.to_string(), &self.reply_topic),
        );
        debug!(
            correlation_id = %correlation_id,
            function = %function,
            "Publishing request"
        );
        if let Err(e) = self.transport.publish(message).await {
            self.pending.cancel(&correlation_id);
            return Err(e.into());
        }

        tokio::select! {
            reply = &mut rx => match reply {
                Ok(response) => Ok(response),
                // Slot dropped without a reply: the sweeper expired the entry.
                Err(_) => Err(CallError::Timeout { function, timeout }),
            },
            () = tokio::time::sleep(timeout) => {
                if self.pending.expire(&correlation_id) {
                    Err(CallError::Timeout { function, timeout })
                } else {
                    // The reply won the race against the deadline.
                    resolved_reply(rx).ok_or(CallError::Timeout { function, timeout })
                }
            }
            () = cancel.cancelled() => {
                self.pending.cancel(&correlation_id);
                Err(CallError::Cancelled { function })
            }
        }
    }

    /// Stop the reply listener and sweeper. In-flight calls resolve as
    /// cancelled or timed out.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Call the `calculator` handler.
    pub async fn calculator(
        &self,
        operation: &str,
        param1: i64,
        param2: i64,
        timeout: Duration,
    ) -> Result<Response, CallError> {
        let mut request = Request::new("calculator");
        request.put_string("operation", operation);
        request.put_integer("param1", param1);
        request.put_integer("param2", param2);
        self.call(request, timeout).await
    }

    /// Call the `getPages` handler.
    pub async fn get_pages(&self, timeout: Duration) -> Result<Response, CallError> {
        self.call(Request::new("getPages"), timeout).await
    }

    /// Call the `buildinfo` handler.
    pub async fn build_info(&self, timeout: Duration) -> Result<Response, CallError> {
        self.call(Request::new("buildinfo"), timeout).await
    }

    /// Call the `quit` handler.
    pub async fn quit(&self, value: bool, timeout: Duration) -> Result<Response, CallError> {
        let mut request = Request::new("quit");
        request.put_boolean("quit", value);
        self.call(request, timeout).await
    }
}

impl Drop for Requester {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Pull an already-sent reply out of the slot after losing the select race.
fn resolved_reply(mut rx: oneshot::Receiver<Response>) -> Option<Response> {
    rx.try_recv().ok()
}

/// Match inbound replies against the pending-call table.
async fn reply_listener(
    mut subscription: Subscription,
    pending: Arc<PendingCallTable>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = shutdown.cancelled() => break,
            msg = subscription.recv() => match msg {
                Some(m) => m,
                None => {
                    warn!("Reply subscription closed");
                    break;
                }
            },
        };

        let Some(token) = message.properties.correlation_id.as_deref() else {
            debug!("Ignoring reply without correlation token");
            continue;
        };
        let correlation_id = match CorrelationId::parse(token) {
            Ok(id) => id,
            Err(_) => {
                debug!(token = %token, "Ignoring reply with unparsable correlation token");
                continue;
            }
        };
        let response = match Response::from_bytes(&message.payload) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Discarding reply that could not be decoded"
                );
                continue;
            }
        };

        // Unknown tokens are stale replies; complete() discards them.
        pending.complete(&correlation_id, response);
    }
}

/// Periodically drop expired entries.
async fn sweeper(pending: Arc<PendingCallTable>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let removed = pending.sweep_expired();
                if removed > 0 {
                    debug!(removed, "Swept expired pending calls");
                }
            }
        }
    }
}
