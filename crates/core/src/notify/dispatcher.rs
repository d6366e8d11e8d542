use std::sync::Arc;

use async_trait::async_trait;

use super::{HttpNotifier, Notification, Notifier, NotifyError};
use crate::config::NotificationsConfig;

/// Notifier that only logs. Used when notifications are disabled.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            channel = notification.channel.as_str(),
            to = %notification.to,
            ticket_number = %notification.ticket_number,
            subject = %notification.subject,
            "Notification (not sent, delivery disabled)"
        );
        Ok(())
    }
}

/// Fire-and-forget front for a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// HTTP delivery when enabled, log-only otherwise.
    pub fn from_config(config: &NotificationsConfig) -> Result<Self, NotifyError> {
        let notifier: Arc<dyn Notifier> = if config.enabled {
            Arc::new(HttpNotifier::new(config)?)
        } else {
            Arc::new(LogNotifier)
        };
        Ok(Self::new(notifier))
    }

    pub fn notifier_name(&self) -> &str {
        self.notifier.name()
    }

    /// Send on a detached task. Outside a tokio runtime the notification is dropped.
    pub fn dispatch(&self, notification: Notification) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(
                ticket_number = %notification.ticket_number,
                "No async runtime, dropping notification"
            );
            return;
        };

        let notifier = Arc::clone(&self.notifier);
        runtime.spawn(async move {
            if let Err(e) = notifier.send(&notification).await {
                tracing::warn!(
                    notifier = notifier.name(),
                    ticket_number = %notification.ticket_number,
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationChannel;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Forwards every notification to a channel.
    struct ChannelNotifier(mpsc::UnboundedSender<Notification>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        fn name(&self) -> &str {
            "channel"
        }

        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            let _ = self.0.send(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::NotConfigured("email".to_string()))
        }
    }

    fn sample() -> Notification {
        Notification {
            channel: NotificationChannel::Email,
            to: "a@example.com".to_string(),
            ticket_number: "T-00001".to_string(),
            subject: "s".to_string(),
            message: "m".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = NotificationDispatcher::new(Arc::new(ChannelNotifier(tx)));

        dispatcher.dispatch(sample());

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(received, sample());
    }

    #[tokio::test]
    async fn test_failures_do_not_propagate() {
        let dispatcher = NotificationDispatcher::new(Arc::new(FailingNotifier));
        dispatcher.dispatch(sample());
        tokio::task::yield_now().await;
    }

    #[test]
    fn test_dispatch_without_runtime_is_noop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = NotificationDispatcher::new(Arc::new(ChannelNotifier(tx)));
        dispatcher.dispatch(sample());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_from_config_disabled_uses_log() {
        let dispatcher = NotificationDispatcher::from_config(&NotificationsConfig::default()).unwrap();
        assert_eq!(dispatcher.notifier_name(), "log");
    }
}
