//! Notification sinks.

use looplist_core::{Notification, NotificationLevel};
use std::sync::Mutex;
use tracing::{info, warn};

/// Receives the outcome of every mutating store operation.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        let loop_id = notification
            .loop_id
            .as_ref()
            .map_or("-", |id| id.as_ref());
        match notification.level {
            NotificationLevel::Success => info!(
                event = notification.event.as_str(),
                loop_id,
                "{}",
                notification.message
            ),
            NotificationLevel::Error => warn!(
                event = notification.event.as_str(),
                loop_id,
                "{}",
                notification.message
            ),
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification.clone());
    }
}
