use crate::app::Console;
use crate::domain::action::Action;
use crate::domain::types::StatusKind;
use crate::infra::dispatcher::DispatchError;

pub struct StatusIndicatorActions<'a> {
    console: &'a Console,
}

impl<'a> StatusIndicatorActions<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }

    pub fn open_status_indicator(&self, status: StatusKind, message: impl Into<String>) -> Result<(), DispatchError> {
        self.console.dispatch(Action::OpenStatus { status, message: message.into() })
    }

    pub fn close_status_indicator(&self) -> Result<(), DispatchError> {
        self.console.dispatch(Action::CloseStatus)
    }
}
