use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::registry::SubscriberRegistry;
use crate::store::Notification;

/// Single consumer of the submission queue.
///
/// Each dequeued notification is offered to every subscriber in a snapshot
/// of the registry. A subscriber that fails to accept it is removed (and
/// thereby closed) and never retried; the others are unaffected.
pub struct BroadcastPump {
    rx: mpsc::Receiver<Arc<Notification>>,
    registry: SubscriberRegistry,
    shutdown: CancellationToken,
}

impl BroadcastPump {
    pub(crate) fn new(
        rx: mpsc::Receiver<Arc<Notification>>,
        registry: SubscriberRegistry,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rx,
            registry,
            shutdown,
        }
    }

    /// Run until the hub shuts down or every queue sender is gone.
    ///
    /// On shutdown the queue is closed to new submissions, whatever is
    /// already buffered is still delivered, and all subscribers are closed.
    pub async fn run(mut self) {
        tracing::debug!("broadcast pump started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(notification) => {
                        self.deliver(&notification);
                    }
                    None => break,
                },
            }
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Some(notification) = self.rx.recv().await {
            self.deliver(&notification);
            drained += 1;
        }

        let closed = self.registry.clear();
        tracing::debug!(drained, closed, "broadcast pump stopped");
    }

    /// Offer one notification to every current subscriber. Returns how many
    /// accepted it.
    fn deliver(&self, notification: &Arc<Notification>) -> usize {
        let mut delivered = 0;
        for subscriber in self.registry.snapshot() {
            match subscriber.try_deliver(notification.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        subscriber = %subscriber.id(),
                        peer = ?subscriber.peer(),
                        id = notification.id,
                        error = %e,
                        "delivery failed, removing subscriber"
                    );
                    self.registry.remove(subscriber.id());
                }
            }
        }
        tracing::trace!(id = notification.id, delivered, "notification broadcast");
        delivered
    }
}
