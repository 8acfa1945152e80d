use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A single notification as stored, listed and delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
}

/// Ordered history of notifications plus the id counter.
///
/// Ids start at 1 and are never reused, even after the record they were
/// assigned to has been deleted. Listing order is insertion order.
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    notifications: Vec<Notification>,
    next_id: u64,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                notifications: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Assign the next id, store the record and return a copy of it.
    pub fn append(&self, title: impl Into<String>, message: impl Into<String>) -> Notification {
        let mut inner = self.inner.lock();
        let notification = Notification {
            id: inner.next_id,
            title: title.into(),
            message: message.into(),
        };
        inner.next_id += 1;
        inner.notifications.push(notification.clone());
        notification
    }

    /// Remove the record with `id`. Returns false if no such record exists.
    pub fn delete_by_id(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.notifications.iter().position(|n| n.id == id) {
            Some(pos) => {
                inner.notifications.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the history. The lock is held only for the copy.
    pub fn list(&self) -> Vec<Notification> {
        self.inner.lock().notifications.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
