//! One-shot gate signaled when the initial sync has completed.

use std::sync::Arc;
use tokio::sync::watch;

/// A gate that opens exactly once.
///
/// Cloning shares the gate. Waiters that arrive after it opened return
/// immediately.
///
/// # Example
/// ```
/// use sidecar_sync::ReadyGate;
///
/// let gate = ReadyGate::new();
/// assert!(!gate.is_ready());
/// assert!(gate.signal());
/// assert!(!gate.signal());
/// assert!(gate.is_ready());
/// ```
#[derive(Debug, Clone)]
pub struct ReadyGate {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadyGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Open the gate. Returns `true` only for the call that opened it.
    pub fn signal(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Whether the gate has opened.
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate opens.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_fires_once() {
        let gate = ReadyGate::new();
        assert!(gate.signal());
        assert!(!gate.signal());
        assert!(gate.is_ready());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = ReadyGate::new();
        let other = gate.clone();
        other.signal();
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn test_wait_after_signal_returns() {
        let gate = ReadyGate::new();
        gate.signal();
        tokio::time::timeout(Duration::from_secs(1), gate.wait())
            .await
            .expect("gate already open");
    }

    #[tokio::test]
    async fn test_wait_wakes_on_signal() {
        let gate = ReadyGate::new();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        gate.signal();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke up")
            .unwrap();
    }
}
