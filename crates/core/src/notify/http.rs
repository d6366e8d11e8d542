use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Notification, NotificationChannel, Notifier, NotifyError};
use crate::config::NotificationsConfig;

/// Posts notifications as JSON to per-channel HTTP endpoints.
pub struct HttpNotifier {
    client: Client,
    email_endpoint: Option<String>,
    whatsapp_endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(config: &NotificationsConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            email_endpoint: config.email_endpoint.clone(),
            whatsapp_endpoint: config.whatsapp_endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, channel: NotificationChannel) -> Option<&str> {
        match channel {
            NotificationChannel::Email => self.email_endpoint.as_deref(),
            NotificationChannel::Whatsapp => self.whatsapp_endpoint.as_deref(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let endpoint = self
            .endpoint(notification.channel)
            .ok_or_else(|| NotifyError::NotConfigured(notification.channel.as_str().to_string()))?;

        let mut request = self.client.post(endpoint).json(notification);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(
            channel = notification.channel.as_str(),
            ticket_number = %notification.ticket_number,
            "Notification delivered"
        );
        Ok(())
    }
}
