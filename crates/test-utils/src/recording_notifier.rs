use std::sync::{Arc, Mutex};

use retraindag::errors::NotifyError;
use retraindag::notify::{Notification, Notifier, NotifyFuture};

/// A notifier that keeps every notification it is asked to send.
///
/// With [`RecordingNotifier::rejecting`] every send is recorded and then
/// reported as rejected, which lets tests check that delivery failures do
/// not fail the run.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    reject: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            sent: Arc::default(),
            reject: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        self.sent.lock().unwrap().push(notification.clone());
        let reject = self.reject;
        Box::pin(async move {
            if reject {
                Err(NotifyError::Rejected(503))
            } else {
                Ok(())
            }
        })
    }
}
