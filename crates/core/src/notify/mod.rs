//! Outbound customer notifications.
//!
//! Lifecycle transitions produce a [`Notification`] which the
//! [`NotificationDispatcher`] hands to a [`Notifier`] on a detached task.
//! Delivery failures are logged and never reach the request that caused them.

mod dispatcher;
mod http;
mod types;

pub use dispatcher::{LogNotifier, NotificationDispatcher};
pub use http::HttpNotifier;
pub use types::{Notification, NotificationChannel};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No endpoint configured for the channel.
    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}

/// A delivery mechanism for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
