//! Cooperative cancellation primitives shared by replication runs.
//!
//! A stop request is a single `()` pulse over a watch channel. Receivers poll
//! [`StopRx::stop_requested`] once per loop iteration, so an in-flight read,
//! encode, or flush always completes before the run winds down.

use tokio::sync::watch;

/// Sending half of a stop channel.
#[derive(Debug, Clone)]
pub struct StopTx(watch::Sender<()>);

impl StopTx {
    /// Requests a cooperative stop of every subscribed receiver.
    ///
    /// Returns an error only when all receivers are already gone, which a caller
    /// is free to ignore since the run has then already terminated.
    pub fn stop(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates an additional receiver bound to this sender.
    pub fn subscribe(&self) -> StopRx {
        StopRx(self.0.subscribe())
    }
}

/// Receiving half of a stop channel.
#[derive(Debug, Clone)]
pub struct StopRx(watch::Receiver<()>);

impl StopRx {
    /// Returns `true` once a stop has been requested.
    ///
    /// The signal is acknowledged on first observation to keep the watch
    /// channel semantics intact for clones of this receiver.
    pub fn stop_requested(&mut self) -> bool {
        let requested = self.0.has_changed().unwrap_or(false);
        if requested {
            self.0.mark_unchanged();
        }

        requested
    }

    /// Completes once a stop has been requested.
    ///
    /// The signal is left pending so a subsequent [`StopRx::stop_requested`]
    /// call still observes it. Completes immediately when the sender is gone,
    /// since no stop can arrive anymore.
    pub async fn stopped(&mut self) {
        if self.0.changed().await.is_ok() {
            self.0.mark_changed();
        }
    }
}

/// Creates a new connected [`StopTx`] / [`StopRx`] pair.
pub fn create_stop_channel() -> (StopTx, StopRx) {
    let (tx, rx) = watch::channel(());
    (StopTx(tx), StopRx(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_observed_once_per_request() {
        let (tx, mut rx) = create_stop_channel();
        assert!(!rx.stop_requested());

        tx.stop().unwrap();
        assert!(rx.stop_requested());
        assert!(!rx.stop_requested());
    }

    #[tokio::test]
    async fn test_stopped_wakes_and_keeps_signal_observable() {
        let (tx, mut rx) = create_stop_channel();

        tx.stop().unwrap();
        rx.stopped().await;
        assert!(rx.stop_requested());
        assert!(!rx.stop_requested());
    }

    #[test]
    fn test_subscribed_receiver_sees_stop() {
        let (tx, _rx) = create_stop_channel();
        let mut other = tx.subscribe();

        tx.stop().unwrap();
        assert!(other.stop_requested());
    }
}
