//! Pending-call table.
//!
//! Maps correlation tokens to waiting callers. Each entry's slot is
//! single-assignment: whichever of reply/timeout/cancel happens first wins,
//! and later attempts on the same token are no-ops because the entry is
//! already gone.

use crate::correlation::CorrelationId;
use dashmap::DashMap;
use rpc_core::Response;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A call waiting for its reply.
struct PendingCall {
    /// Single-assignment slot the caller blocks on.
    slot: oneshot::Sender<Response>,
    /// Function name, for logging.
    function: String,
    /// When the call was issued.
    created_at: Instant,
    /// Absolute deadline.
    deadline: Instant,
}

/// Counters over the table's lifetime.
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Calls registered.
    pub registered: AtomicU64,
    /// Calls resolved by a matching reply.
    pub completed: AtomicU64,
    /// Calls that hit their deadline.
    pub timeouts: AtomicU64,
    /// Calls cancelled by the caller.
    pub cancelled: AtomicU64,
}

/// Concurrent map of live correlation entries.
///
/// At most one live entry exists per token; a reply for a token not in the
/// table is stale and is discarded by the caller of [`complete`].
///
/// [`complete`]: PendingCallTable::complete
pub struct PendingCallTable {
    pending: DashMap<CorrelationId, PendingCall>,
    stats: PendingStats,
}

impl PendingCallTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: PendingStats::default(),
        }
    }

    /// Register a call and get the receiver its issuer will block on.
    pub fn register(
        &self,
        function: &str,
        timeout: Duration,
    ) -> (CorrelationId, oneshot::Receiver<Response>) {
        let correlation_id = CorrelationId::new();
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();

        self.pending.insert(
            correlation_id,
            PendingCall {
                slot: tx,
                function: function.to_string(),
                created_at: now,
                deadline: now + timeout,
            },
        );
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            function = function,
            "Registered pending call"
        );
        (correlation_id, rx)
    }

    /// Resolve a pending call with its reply.
    ///
    /// Returns false when the token is unknown (stale reply) or the caller
    /// already gave up; the reply is discarded in either case.
    pub fn complete(&self, correlation_id: &CorrelationId, response: Response) -> bool {
        let Some((_, call)) = self.pending.remove(correlation_id) else {
            debug!(
                correlation_id = %correlation_id,
                "Discarding reply with unknown correlation token"
            );
            return false;
        };

        let elapsed = call.created_at.elapsed();
        match call.slot.send(response) {
            Ok(()) => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    function = call.function,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                // Caller stopped waiting between lookup and send.
                debug!(
                    correlation_id = %correlation_id,
                    function = call.function,
                    "Pending call receiver dropped"
                );
                false
            }
        }
    }

    /// Remove an entry because its deadline elapsed.
    ///
    /// Returns false if the entry was already resolved.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove an entry because the caller cancelled.
    ///
    /// Returns false if the entry was already resolved.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Drop every entry whose deadline has passed. Backstop for callers
    /// that never observe their own timeout; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, call| {
            if now < call.deadline {
                return true;
            }
            warn!(
                correlation_id = %id,
                function = call.function,
                elapsed_ms = call.created_at.elapsed().as_millis() as u64,
                "Sweeping expired pending call"
            );
            self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
            removed += 1;
            false
        });
        removed
    }

    /// Number of calls currently pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingCallTable {
    fn default() -> Self {
        Self::new()
    }
}
