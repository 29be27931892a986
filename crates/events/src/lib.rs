//! Notification event bus and delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DispositionEvent`]: the envelope carried on the bus.
//! - [`BusNotifier`]: the workflow's `Notifier` port, publishing to the bus.
//! - [`NotificationDispatcher`]: background consumer that de-duplicates and
//!   stores notifications.

pub mod bus;
pub mod dispatcher;
pub mod notifier;

pub use bus::{DispositionEvent, EventBus};
pub use dispatcher::NotificationDispatcher;
pub use notifier::BusNotifier;
