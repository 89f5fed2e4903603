//! # PetPort Notifications
//!
//! Grace period notices for subscribers and batched corruption alerts for
//! operators, delivered through a `NotificationDispatcher`.

pub mod dispatcher;
pub mod errors;
pub mod notification;
pub mod smtp;

pub use dispatcher::{create_dispatcher, LogDispatcher, MemoryDispatcher, NotificationDispatcher};
pub use errors::{DispatchError, DispatchResult, UnknownEventKind};
pub use notification::{GraceEventKind, GracePeriodNotice, Notification, RenderedMessage};
pub use smtp::{EmailSettings, SmtpDispatcher};
