//! Process shutdown signal.
//!
//! Tracks whether a quit has been served and releases the main wait once it
//! has. Release is idempotent: when several quit calls race, exactly one
//! observes itself as the releaser and the rest are no-ops.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared shutdown flag with an awaitable release.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Create an unreleased signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Release the signal. Returns true only for the call that actually
    /// flipped the flag.
    pub fn release(&self) -> bool {
        self.tx.send_if_modified(|released| {
            if *released {
                false
            } else {
                *released = true;
                true
            }
        })
    }

    /// Whether the signal has been released.
    #[must_use]
    pub fn released(&self) -> bool {
        *self.tx.borrow()
    }

    /// Block until the signal is released. This is the one intentionally
    /// unbounded wait in the system; the responder main sits here.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_release_unblocks_wait() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        assert!(!signal.released());
        assert!(signal.release());
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait should unblock")
            .unwrap();
        assert!(signal.released());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let signal = ShutdownSignal::new();
        assert!(signal.release());
        assert!(!signal.release());
        assert!(!signal.release());
    }

    #[tokio::test]
    async fn test_racing_releases_fire_exactly_once() {
        let signal = ShutdownSignal::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let s = signal.clone();
            handles.push(tokio::spawn(async move { s.release() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_wait_after_release_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.release();
        timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("wait should not block after release");
    }
}
