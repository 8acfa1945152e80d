//! Registry of live subscriber connections.
//!
//! A [`Subscriber`] is the hub-side handle to one outbound connection. The
//! connection side holds the matching [`Outbound`] and is the only writer
//! to the underlying socket, so deliveries to a connection are serialized.
//!
//! Removing a subscriber from the registry closes it: the handle's close
//! token is cancelled and the connection's [`Outbound::recv`] returns `None`
//! once any already-buffered notifications are drained.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::Notification;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber buffer full")]
    Full,

    #[error("subscriber connection closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hub-side handle to a subscriber connection.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    peer: Option<SocketAddr>,
    tx: mpsc::Sender<Arc<Notification>>,
    closed: CancellationToken,
}

/// Connection-side half of a subscriber: yields notifications to write.
pub struct Outbound {
    rx: mpsc::Receiver<Arc<Notification>>,
    closed: CancellationToken,
}

impl Subscriber {
    /// Create a subscriber handle with room for `buffer` undelivered
    /// notifications, and the outbound half for its connection.
    pub fn channel(buffer: usize) -> (Self, Outbound) {
        let (tx, rx) = mpsc::channel(buffer);
        let closed = CancellationToken::new();
        let subscriber = Self {
            id: SubscriberId::new(),
            peer: None,
            tx,
            closed: closed.clone(),
        };
        (subscriber, Outbound { rx, closed })
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Hand a notification to the connection without waiting.
    ///
    /// A full buffer counts as a failure: a subscriber that cannot keep up
    /// must not hold back delivery to everyone else.
    pub fn try_deliver(&self, notification: Arc<Notification>) -> Result<(), DeliveryError> {
        if self.closed.is_cancelled() {
            return Err(DeliveryError::Closed);
        }
        self.tx.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Outbound {
    /// Next notification to write, or `None` once the subscriber is closed.
    ///
    /// Notifications already buffered when the subscriber is closed are
    /// still returned before `None`.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        tokio::select! {
            biased;
            n = self.rx.recv() => n,
            _ = self.closed.cancelled() => self.rx.try_recv().ok(),
        }
    }

    /// Resolves when the hub side has closed this subscriber.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

/// Set of currently connected subscribers, keyed by id.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<HashMap<SubscriberId, Subscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a subscriber. Returns false, leaving the existing entry in
    /// place, if a subscriber with the same id is already registered.
    pub fn add(&self, subscriber: Subscriber) -> bool {
        let mut inner = self.inner.lock();
        if inner.contains_key(&subscriber.id) {
            return false;
        }
        inner.insert(subscriber.id, subscriber);
        true
    }

    /// Remove and close a subscriber. Returns false if it was not registered.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.inner.lock().remove(&id);
        match removed {
            Some(subscriber) => {
                subscriber.close();
                true
            }
            None => false,
        }
    }

    /// Copy of the current membership, safe to iterate without the lock.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.inner.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and close every subscriber. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<Subscriber> = self.inner.lock().drain().map(|(_, s)| s).collect();
        for subscriber in &drained {
            subscriber.close();
        }
        drained.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
