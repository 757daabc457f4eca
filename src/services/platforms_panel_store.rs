//! Open/closed state of the platforms side panel

use crate::domain::action::Action;
use crate::infra::store::Store;

#[derive(Default)]
pub struct PlatformsPanelStore {
    /// `None` until the panel is first toggled
    expanded: Option<bool>,
}

impl PlatformsPanelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_expanded(&self) -> Option<bool> {
        self.expanded
    }
}

impl Store for PlatformsPanelStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::TogglePlatformsPanel => {
                self.expanded = Some(self.expanded.map_or(true, |open| !open));
                true
            }
            Action::ClearAuthorization => {
                self.expanded = None;
                true
            }
            _ => false,
        }
    }
}
