//! Session token and username
//!
//! Rehydrated from session storage when constructed, persisted on every change.

use crate::domain::action::Action;
use crate::infra::session_storage::SessionStorage;
use crate::infra::store::Store;
use std::sync::Arc;
use tracing::{info, warn};

const AUTHORIZATION_KEY: &str = "authorization";
const USERNAME_KEY: &str = "username";

pub struct AuthorizationStore {
    authorization: Option<String>,
    username: Option<String>,
    storage: Arc<dyn SessionStorage>,
}

impl AuthorizationStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let authorization = storage.get_item(AUTHORIZATION_KEY);
        let username = storage.get_item(USERNAME_KEY);
        Self { authorization, username, storage }
    }

    pub fn get_authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn get_username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn persist(&self) {
        let results = [
            (AUTHORIZATION_KEY, &self.authorization),
            (USERNAME_KEY, &self.username),
        ]
        .map(|(key, value)| match value {
            Some(value) => self.storage.set_item(key, value),
            None => self.storage.remove_item(key),
        });
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "session_persist_failed");
            }
        }
    }
}

impl Store for AuthorizationStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::ReceiveAuthorization { token, username } => {
                self.authorization = Some(token.clone());
                self.username = Some(username.clone());
                self.persist();
                info!(username = %username, "session_started");
                true
            }
            Action::ReceiveUnauthorized { error } => {
                warn!(error = %error, "session_unauthorized");
                true
            }
            Action::ClearAuthorization => {
                self.authorization = None;
                self.username = None;
                self.persist();
                info!("session_cleared");
                true
            }
            _ => false,
        }
    }
}
