// src/notify/channels.rs

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::errors::{NotifyError, Result};
use crate::notify::message::{Notification, NotificationKind};
use crate::notify::{Notifier, NotifyFuture};

/// Writes the notification as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        Box::pin(async move {
            match notification.kind {
                NotificationKind::Success => info!(
                    run_id = %notification.run_id,
                    outcome = notification.outcome,
                    recipients = ?notification.recipients,
                    subject = %notification.subject,
                    "{}",
                    notification.body
                ),
                NotificationKind::Failure => warn!(
                    run_id = %notification.run_id,
                    outcome = notification.outcome,
                    recipients = ?notification.recipients,
                    subject = %notification.subject,
                    "{}",
                    notification.body
                ),
            }
            Ok(())
        })
    }
}

/// POSTs the notification as JSON.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url.clone())
                .json(notification)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(NotifyError::Rejected(status.as_u16()));
            }
            Ok(())
        })
    }
}
