//! Transient user-facing notifications.
//!
//! The chat view records a notification for each outcome the user should
//! see (failed generation, generated copy, ...). Front ends drain and render
//! them after every action.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Notification severity
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A single transient notification
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

/// Ordered log of pending notifications
#[derive(Debug, Default)]
pub struct Notifier {
    pending: Mutex<Vec<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) {
        let notification = Notification {
            kind,
            title: title.into(),
            description: description.into(),
            at: Utc::now(),
        };
        match kind {
            NotificationKind::Success => {
                info!("{}: {}", notification.title, notification.description)
            }
            NotificationKind::Error => {
                warn!("{}: {}", notification.title, notification.description)
            }
        }
        self.lock().push(notification);
    }

    pub fn success(&self, description: impl Into<String>) {
        self.push(NotificationKind::Success, "Sucesso!", description);
    }

    pub fn error(&self, description: impl Into<String>) {
        self.push(NotificationKind::Error, "Erro", description);
    }

    /// Take every pending notification, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    /// Snapshot of pending error notifications
    pub fn errors(&self) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter(|n| n.kind == NotificationKind::Error)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        // A poisoned log still holds valid notifications
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain_in_order() {
        let notifier = Notifier::new();
        notifier.success("Copy gerado com sucesso.");
        notifier.error("Falha ao enviar mensagem. Tente novamente.");

        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.errors().len(), 1);

        let drained = notifier.drain();
        assert_eq!(drained[0].kind, NotificationKind::Success);
        assert_eq!(drained[1].kind, NotificationKind::Error);
        assert_eq!(drained[1].title, "Erro");
        assert!(notifier.is_empty());
    }
}
