pub mod notification_dispatcher;
pub mod notification_handlers;
pub mod notification_hub;
pub mod notification_models;
pub mod routes;

pub use notification_dispatcher::NotificationDispatcher;
pub use notification_hub::{Broadcaster, DispatchError, NotificationHub};
pub use notification_models::{Notification, NotificationKind};
