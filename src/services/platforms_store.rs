//! Registered platforms and their agents

use crate::domain::action::Action;
use crate::domain::types::{Agent, Platform};
use crate::infra::store::Store;
use tracing::debug;

#[derive(Debug, Default)]
pub struct PlatformsStore {
    platforms: Vec<Platform>,
}

fn name_contains(agent: &Agent, needle: &str) -> bool {
    agent.name.to_lowercase().contains(&needle.to_lowercase())
}

impl PlatformsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn get_platform(&self, uuid: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.uuid == uuid)
    }

    pub fn is_registered(&self, uuid: &str) -> bool {
        self.get_platform(uuid).is_some()
    }

    /// The platform hosting the central agent
    pub fn get_vc_instance(&self) -> Option<&Platform> {
        self.platforms.iter().find(|p| {
            p.agents
                .as_deref()
                .is_some_and(|agents| agents.iter().any(|a| name_contains(a, "volttroncentral")))
        })
    }

    /// True when an agent whose name contains `agent` is running on the platform
    pub fn get_agent_running(&self, platform_uuid: &str, agent: &str) -> bool {
        self.get_platform(platform_uuid)
            .and_then(|p| p.agents.as_deref())
            .is_some_and(|agents| agents.iter().any(|a| name_contains(a, agent) && a.is_running()))
    }

    pub fn get_historian_running(&self, platform_uuid: &str) -> bool {
        self.get_agent_running(platform_uuid, "historian")
    }

    pub fn get_bacnet_proxies(&self, platform_uuid: &str) -> Vec<&Agent> {
        self.get_platform(platform_uuid)
            .and_then(|p| p.agents.as_deref())
            .map(|agents| agents.iter().filter(|a| name_contains(a, "bacnet_proxy")).collect())
            .unwrap_or_default()
    }
}

impl Store for PlatformsStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::ClearAuthorization => {
                self.platforms.clear();
                true
            }
            Action::ReceivePlatforms { platforms } => {
                self.platforms = platforms.clone();
                debug!(count = self.platforms.len(), "platforms_received");
                true
            }
            Action::ReceivePlatform { platform } => {
                match self.platforms.iter_mut().find(|p| p.uuid == platform.uuid) {
                    Some(existing) => *existing = platform.clone(),
                    None => self.platforms.push(platform.clone()),
                }
                true
            }
            _ => false,
        }
    }
}
