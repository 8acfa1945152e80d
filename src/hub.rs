//! The notification hub: history, subscribers and the broadcast queue
//! behind one cloneable handle.
//!
//! Adapters (HTTP handlers, the WebSocket handler, the periodic generator)
//! only ever talk to [`Hub`]. The matching [`BroadcastPump`] returned by
//! [`Hub::new`] must be spawned for submissions to reach subscribers.
//!
//! # Backpressure
//!
//! The queue between [`Hub::submit`] and the pump is bounded. A submission
//! first waits up to `submit_timeout` for a free slot and fails with
//! [`HubError::Busy`] if none frees up. Nothing is stored in that case, so
//! the caller can retry without creating a duplicate record. Once a slot is
//! held the record is appended and enqueued without further waiting.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::pump::BroadcastPump;
use crate::registry::{Subscriber, SubscriberId, SubscriberRegistry};
use crate::store::{Notification, NotificationStore};

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubError {
    #[error("broadcast queue is full")]
    Busy,

    #[error("hub is shut down")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the queue between submissions and the broadcast pump.
    pub queue_capacity: usize,
    /// How long a submission may wait for queue space before `Busy`.
    pub submit_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct Hub {
    store: NotificationStore,
    registry: SubscriberRegistry,
    queue: mpsc::Sender<Arc<Notification>>,
    shutdown: CancellationToken,
    submit_timeout: Duration,
}

impl Hub {
    pub fn new(config: HubConfig) -> (Self, BroadcastPump) {
        let (queue, rx) = mpsc::channel(config.queue_capacity);
        let registry = SubscriberRegistry::new();
        let shutdown = CancellationToken::new();
        let pump = BroadcastPump::new(rx, registry.clone(), shutdown.clone());

        let hub = Self {
            store: NotificationStore::new(),
            registry,
            queue,
            shutdown,
            submit_timeout: config.submit_timeout,
        };
        (hub, pump)
    }

    /// Store a new notification and queue it for broadcast.
    pub async fn submit(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Notification, HubError> {
        if self.shutdown.is_cancelled() {
            return Err(HubError::Closed);
        }

        let permit = match tokio::time::timeout(self.submit_timeout, self.queue.reserve()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(HubError::Closed),
            Err(_) => {
                tracing::warn!(timeout = ?self.submit_timeout, "broadcast queue full, rejecting submission");
                return Err(HubError::Busy);
            }
        };

        let notification = self.store.append(title, message);
        permit.send(Arc::new(notification.clone()));
        tracing::debug!(id = notification.id, title = %notification.title, "notification submitted");
        Ok(notification)
    }

    pub fn list(&self) -> Vec<Notification> {
        self.store.list()
    }

    /// Delete a notification from the history. Subscribers that already
    /// received it are unaffected.
    pub fn delete(&self, id: u64) -> bool {
        let removed = self.store.delete_by_id(id);
        tracing::debug!(id, removed, "notification delete");
        removed
    }

    /// Register a subscriber. Returns false if it is already registered or
    /// the hub has shut down, in which case the subscriber is closed.
    pub fn subscribe(&self, subscriber: Subscriber) -> bool {
        if self.shutdown.is_cancelled() {
            subscriber.close();
            return false;
        }
        let id = subscriber.id();
        let peer = subscriber.peer();
        let added = self.registry.add(subscriber);
        if added {
            tracing::info!(subscriber = %id, ?peer, "subscriber registered");
        }
        added
    }

    /// Remove and close a subscriber.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            tracing::info!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn notification_count(&self) -> usize {
        self.store.len()
    }

    /// Stop accepting submissions. The pump delivers what is already queued,
    /// closes every subscriber and exits. Calling this more than once is a
    /// no-op.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("hub shutting down");
            self.shutdown.cancel();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
