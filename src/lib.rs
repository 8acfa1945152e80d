pub mod api;
pub mod config;
pub mod generator;
pub mod hub;
pub mod pump;
pub mod registry;
pub mod shutdown;
pub mod store;

pub use hub::{Hub, HubConfig, HubError};
pub use registry::{Subscriber, SubscriberId, SubscriberRegistry};
pub use store::{Notification, NotificationStore};
