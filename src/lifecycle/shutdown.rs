//! Shutdown coordination between the proxy and query listeners.
//!
//! Both servers hold a receiver and stop accepting once it fires. Draining
//! the capture queue and closing the store happen afterwards, in
//! `RecorderHandle::shutdown`, so no capture is submitted after the drain
//! starts.

use tokio::sync::broadcast;

/// Stop signal shared by the proxy and query listeners.
///
/// Subscribe before spawning a server: a trigger only reaches receivers
/// that exist when it is sent.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for one server's graceful-shutdown future.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell both listeners to stop accepting. In-flight exchanges finish and
    /// are still recorded.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Listeners still holding a receiver, i.e. not yet stopped.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        Shutdown::default().trigger();
    }
}
