//! In-memory notifier for tests.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::ports::{Notification, NotificationKind, Notifier};

/// Captures every notification in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.guard().clone()
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.guard().iter().filter(|n| n.kind == kind).count()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) {
        self.guard().push(notification);
    }
}
