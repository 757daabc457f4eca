//! Transient success/error banner

use crate::domain::action::Action;
use crate::domain::types::StatusKind;
use crate::infra::store::Store;
use tracing::debug;

#[derive(Default)]
pub struct StatusIndicatorStore {
    status: Option<StatusKind>,
    message: Option<String>,
}

impl StatusIndicatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while the banner is closed
    pub fn get_status(&self) -> Option<StatusKind> {
        self.status
    }

    pub fn get_status_message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Store for StatusIndicatorStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::OpenStatus { status, message } => {
                debug!(status = status.as_str(), message = %message, "status_opened");
                self.status = Some(*status);
                self.message = Some(message.clone());
                true
            }
            Action::CloseStatus => {
                self.status = None;
                self.message = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_close() {
        let mut store = StatusIndicatorStore::new();
        assert_eq!(store.get_status(), None);

        assert!(store.reduce(&Action::OpenStatus {
            status: StatusKind::Error,
            message: "Unable to load platforms".into(),
        }));
        assert_eq!(store.get_status(), Some(StatusKind::Error));
        assert_eq!(store.get_status_message(), Some("Unable to load platforms"));

        // A newer message replaces the open one
        store.reduce(&Action::OpenStatus { status: StatusKind::Success, message: "Saved".into() });
        assert_eq!(store.get_status(), Some(StatusKind::Success));

        assert!(store.reduce(&Action::CloseStatus));
        assert_eq!(store.get_status_message(), None);
        assert!(!store.reduce(&Action::TogglePlatformsPanel));
    }
}
