// src/notify/mod.rs

//! Run outcome notifications.
//!
//! The `notify` node composes a [`Notification`] and hands it to a
//! [`Notifier`]. Delivery failures are reported back but never fail the run.

pub mod channels;
pub mod message;

use std::future::Future;
use std::pin::Pin;

pub use channels::{LogNotifier, WebhookNotifier};
pub use message::{Notification, NotificationKind};

use crate::config::{ApiConfig, NotifyConfig};
use crate::errors::{NotifyError, Result, RetraindagError};
use crate::types::NotifyChannel;

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = std::result::Result<(), NotifyError>> + Send + 'a>>;

/// Trait abstracting how a notification is delivered.
pub trait Notifier: Send + Sync {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a>;
}

/// The notifier selected by `[notify].channel`.
#[derive(Debug, Clone)]
pub enum ConfiguredNotifier {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl ConfiguredNotifier {
    /// Webhook requests share the API request timeout.
    pub fn from_config(notify: &NotifyConfig, api: &ApiConfig) -> Result<Self> {
        match notify.channel {
            NotifyChannel::Log => Ok(ConfiguredNotifier::Log(LogNotifier)),
            NotifyChannel::Webhook => {
                let url = notify.webhook_url.clone().ok_or_else(|| {
                    RetraindagError::ConfigError(
                        "[notify].webhook_url is required when channel = \"webhook\"".to_string(),
                    )
                })?;
                Ok(ConfiguredNotifier::Webhook(WebhookNotifier::new(
                    url,
                    api.request_timeout,
                )?))
            }
        }
    }
}

impl Notifier for ConfiguredNotifier {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        match self {
            ConfiguredNotifier::Log(n) => n.send(notification),
            ConfiguredNotifier::Webhook(n) => n.send(notification),
        }
    }
}
