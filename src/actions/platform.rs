//! Agents and saved charts of a platform
//!
//! Saved charts live in the server-side setting keyed by the username, so
//! every user keeps their own pinned charts.

use crate::app::Console;
use crate::domain::action::Action;
use crate::domain::chart::Chart;
use crate::domain::types::{Agent, AgentFile, AgentStatus, InstallResult, Platform, StatusKind};
use crate::infra::dispatcher::DispatchError;
use crate::io::exchange::RpcRequest;
use crate::io::rpc_error::RpcError;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// `platforms.uuid.<uuid>.<method>`
pub(crate) fn platform_method(platform_uuid: &str, method: &str) -> String {
    format!("platforms.uuid.{platform_uuid}.{method}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentCommand {
    Start,
    Stop,
}

impl AgentCommand {
    fn method(&self) -> &'static str {
        match self {
            AgentCommand::Start => "start_agent",
            AgentCommand::Stop => "stop_agent",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            AgentCommand::Start => "start",
            AgentCommand::Stop => "stop",
        }
    }
}

pub struct PlatformActions<'a> {
    console: &'a Console,
}

impl<'a> PlatformActions<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Agents, then the saved charts
    pub async fn load_platform(&self, platform: &Platform) -> Result<(), DispatchError> {
        self.load_agents(platform).await?;
        self.load_charts().await
    }

    /// `list_agents`, then `status_agents` when the list is not empty
    pub async fn load_agents(&self, platform: &Platform) -> Result<(), DispatchError> {
        let failure = |e: &RpcError| format!("Unable to load agents for platform {}: {}", platform.name, e.message());

        let agents: Vec<Agent> =
            match self.console.request(RpcRequest::new(platform_method(&platform.uuid, "list_agents"))).await {
                Ok(agents) => agents,
                Err(e) => {
                    let message = failure(&e);
                    return self.console.report_failure(e, message);
                }
            };

        let mut platform = platform.clone().with_agents(agents);
        self.console.dispatch(Action::ReceivePlatform { platform: platform.clone() })?;
        if platform.agents.as_deref().is_some_and(<[Agent]>::is_empty) {
            return Ok(());
        }

        let statuses: Vec<AgentStatus> =
            match self.console.request(RpcRequest::new(platform_method(&platform.uuid, "status_agents"))).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    let message = failure(&e);
                    return self.console.report_failure(e, message);
                }
            };

        for agent in platform.agents.iter_mut().flatten() {
            let status = statuses.iter().find(|s| s.uuid.as_deref() == Some(agent.uuid.as_str()));
            agent.action_pending = Some(false);
            agent.process_id = status.and_then(|s| s.process_id);
            agent.return_code = status.and_then(|s| s.return_code);
        }
        debug!(platform = %platform.uuid, statuses = statuses.len(), "agent_statuses_loaded");
        self.console.dispatch(Action::ReceivePlatform { platform })
    }

    pub async fn start_agent(&self, platform_uuid: &str, agent_uuid: &str) -> Result<(), DispatchError> {
        self.agent_command(platform_uuid, agent_uuid, AgentCommand::Start).await
    }

    pub async fn stop_agent(&self, platform_uuid: &str, agent_uuid: &str) -> Result<(), DispatchError> {
        self.agent_command(platform_uuid, agent_uuid, AgentCommand::Stop).await
    }

    /// Copy of the stored platform with `agent_uuid` marked pending
    fn mark_pending(&self, platform_uuid: &str, agent_uuid: &str) -> Option<(Platform, String)> {
        let mut platform = self.console.platforms().read().get_platform(platform_uuid)?.clone();
        let agent = platform.agent_mut(agent_uuid)?;
        agent.action_pending = Some(true);
        let name = agent.name.clone();
        Some((platform, name))
    }

    async fn agent_command(
        &self,
        platform_uuid: &str,
        agent_uuid: &str,
        command: AgentCommand,
    ) -> Result<(), DispatchError> {
        let Some((mut platform, agent_name)) = self.mark_pending(platform_uuid, agent_uuid) else {
            warn!(platform = %platform_uuid, agent = %agent_uuid, "agent_command_for_unknown_agent");
            return Ok(());
        };
        self.console.dispatch(Action::ReceivePlatform { platform: platform.clone() })?;

        let request = RpcRequest::new(platform_method(platform_uuid, command.method())).with_params(json!([agent_uuid]));
        let outcome = self.console.request::<AgentStatus>(request).await;

        // The pending flag is cleared whatever the outcome
        let mut failure = None;
        if let Some(agent) = platform.agent_mut(agent_uuid) {
            agent.action_pending = Some(false);
            match outcome {
                Ok(status) => {
                    agent.process_id = status.process_id;
                    agent.return_code = status.return_code;
                    info!(agent = %agent_uuid, command = command.verb(), process_id = ?status.process_id, "agent_command_completed");
                }
                Err(e) => failure = Some(e),
            }
        }
        if let Some(e) = failure {
            let message = format!("Unable to {} agent {}: {}", command.verb(), agent_name, e.message());
            self.console.report_failure(e, message)?;
        }
        self.console.dispatch(Action::ReceivePlatform { platform })
    }

    pub async fn remove_agent(&self, platform_uuid: &str, agent_uuid: &str) -> Result<(), DispatchError> {
        let Some((platform, agent_name)) = self.mark_pending(platform_uuid, agent_uuid) else {
            warn!(platform = %platform_uuid, agent = %agent_uuid, "remove_for_unknown_agent");
            return Ok(());
        };
        self.console.dispatch(Action::ReceivePlatform { platform: platform.clone() })?;

        let request = RpcRequest::new(platform_method(platform_uuid, "remove_agent")).with_params(json!([agent_uuid]));
        match self.console.request::<Value>(request).await {
            Ok(result) => match result.get("error").and_then(Value::as_str) {
                Some(error) => self
                    .console
                    .status_indicator()
                    .open_status_indicator(StatusKind::Error, format!("Unable to remove agent {agent_name}: {error}")),
                None => {
                    info!(platform = %platform_uuid, agent = %agent_uuid, "agent_removed");
                    self.load_platform(&platform).await
                }
            },
            Err(e) => {
                let message = format!("Unable to remove agent {}: {}", agent_name, e.message());
                self.console.report_failure(e, message)
            }
        }
    }

    /// Install agent packages; reloads the platform unless every package failed
    pub async fn install_agents(&self, platform: &Platform, files: Vec<AgentFile>) -> Result<(), DispatchError> {
        let count = files.len();
        let request = RpcRequest::new(platform_method(&platform.uuid, "install")).with_params(json!({ "files": files }));
        let results: Vec<InstallResult> = match self.console.request(request).await {
            Ok(results) => results,
            Err(e) => {
                let message = format!("Unable to install agents for platform {}: {}", platform.name, e.message());
                return self.console.report_failure(e, message);
            }
        };

        let errors: Vec<String> = results.into_iter().filter_map(|r| r.error).collect();
        if !errors.is_empty() {
            self.console.status_indicator().open_status_indicator(
                StatusKind::Error,
                format!("Unable to install agents for platform {}: {}", platform.name, errors.join("\n")),
            )?;
        }
        info!(platform = %platform.uuid, files = count, failed = errors.len(), "agents_installed");
        if errors.len() != count {
            self.load_platform(platform).await?;
        }
        Ok(())
    }

    /// Replace the charts with the user's saved ones, if any were saved
    pub async fn load_charts(&self) -> Result<(), DispatchError> {
        let Some(username) = self.username() else {
            return Ok(());
        };
        let failure = |e: &RpcError| format!("Unable to load charts: {}", e.message());

        let keys: Vec<String> = match self.console.request(RpcRequest::new("get_setting_keys")).await {
            Ok(keys) => keys,
            Err(e) => {
                let message = failure(&e);
                return self.console.report_failure(e, message);
            }
        };
        if !keys.contains(&username) {
            debug!(username = %username, "no_saved_charts");
            return Ok(());
        }

        let request = RpcRequest::new("get_setting").with_params(json!({ "key": username }));
        match self.console.request::<Option<Vec<Chart>>>(request).await {
            Ok(charts) => {
                let charts = charts.unwrap_or_default();
                debug!(username = %username, charts = charts.len(), "saved_charts_loaded");
                self.console.dispatch(Action::LoadCharts { charts })
            }
            Err(e) => {
                let message = failure(&e);
                self.console.report_failure(e, message)
            }
        }
    }

    /// Save `charts`, or the currently pinned charts
    pub async fn save_charts(&self, charts: Option<Vec<Chart>>) -> Result<(), DispatchError> {
        let charts = charts.unwrap_or_else(|| self.console.charts().read().get_pinned_charts());
        self.store_charts(charts, "Unable to save charts").await
    }

    /// Drop `chart_key` from the saved charts
    pub async fn delete_chart(&self, chart_key: &str) -> Result<(), DispatchError> {
        let charts: Vec<Chart> = self
            .console
            .charts()
            .read()
            .get_pinned_charts()
            .into_iter()
            .filter(|c| c.chart_key != chart_key)
            .collect();
        self.store_charts(charts, "Unable to delete chart").await
    }

    async fn store_charts(&self, charts: Vec<Chart>, failure: &str) -> Result<(), DispatchError> {
        let Some(username) = self.username() else {
            debug!("charts_not_saved_without_session");
            return Ok(());
        };
        let count = charts.len();
        let result = match serde_json::to_value(&charts) {
            Ok(value) => {
                let request = RpcRequest::new("set_setting").with_params(json!({ "key": username, "value": value }));
                self.console.request::<Value>(request).await
            }
            Err(e) => Err(RpcError::Decode(e.to_string())),
        };
        match result {
            Ok(_) => {
                debug!(username = %username, charts = count, "charts_saved");
                Ok(())
            }
            Err(e) => {
                let message = format!("{failure}: {}", e.message());
                self.console.report_failure(e, message)
            }
        }
    }

    fn username(&self) -> Option<String> {
        self.console.authorization().read().get_username().map(str::to_string)
    }
}
