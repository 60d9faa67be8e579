//! Whole-run cancellation.
//!
//! Separate from per-method timeouts: a fired token interrupts the
//! method in flight, flushes queued work, and switches the runner to
//! a bounded drain.

use std::sync::Arc;

use tokio::sync::watch;

/// Clonable handle for interrupting a run from outside. All clones
/// share one signal; firing it is idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the token fires. A token dropped without firing
/// never resolves: losing the handle is not a cancellation.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fired_token_resolves_waiters() {
        let token = CancelToken::new();
        let mut rx = token.subscribe();
        assert!(!token.is_cancelled());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), cancelled(&mut rx))
            .await
            .expect("cancelled() should resolve after cancel()");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn clones_share_the_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        let mut rx = token.subscribe();

        clone.cancel();
        tokio::time::timeout(Duration::from_secs(1), cancelled(&mut rx))
            .await
            .expect("clone's cancel should reach the original's subscribers");
    }

    #[tokio::test]
    async fn dropped_token_is_not_a_cancellation() {
        let mut rx = {
            let token = CancelToken::new();
            token.subscribe()
        };
        let waited = tokio::time::timeout(Duration::from_millis(50), cancelled(&mut rx)).await;
        assert!(waited.is_err(), "cancelled() must not resolve on drop");
    }
}
