//! Side panel: lazy loading of a platform's children and tree interaction

use crate::actions::platform::platform_method;
use crate::app::Console;
use crate::domain::action::{Action, ChartItem};
use crate::domain::types::{Agent, DeviceRecord, DeviceStatus, NodeType, PerformanceRecord};
use crate::infra::dispatcher::DispatchError;
use crate::io::exchange::RpcRequest;
use crate::io::rpc_error::RpcError;
use crate::services::panel_items::platform_path;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub struct PlatformsPanelActions<'a> {
    console: &'a Console,
}

impl<'a> PlatformsPanelActions<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }

    pub fn toggle_panel(&self) -> Result<(), DispatchError> {
        self.console.dispatch(Action::TogglePlatformsPanel)
    }

    /// Load devices, agents and performance points of a platform, in that order
    ///
    /// Each step runs only if the previous one succeeded. `END_LOADING_DATA`
    /// is dispatched whatever happens.
    pub async fn load_children(&self, node_type: NodeType, uuid: &str) -> Result<(), DispatchError> {
        if node_type != NodeType::Platform {
            debug!(uuid = %uuid, node_type = node_type.as_str(), "load_children_ignored");
            return Ok(());
        }
        let name = match self.console.panel_items().read().get_item(&platform_path(uuid)) {
            Some(node) => node.name.clone(),
            None => {
                warn!(platform = %uuid, "load_children_for_unknown_platform");
                return Ok(());
            }
        };

        self.console.dispatch(Action::StartLoadingData { uuid: uuid.to_string() })?;
        let loaded = self.load_platform_children(uuid, &name).await;
        self.console.dispatch(Action::EndLoadingData { uuid: uuid.to_string() })?;
        loaded
    }

    async fn load_platform_children(&self, uuid: &str, name: &str) -> Result<(), DispatchError> {
        let devices: BTreeMap<String, DeviceStatus> =
            match self.console.request(RpcRequest::new(platform_method(uuid, "get_devices"))).await {
                Ok(devices) => devices,
                Err(e) => {
                    let message = format!("Unable to load devices for platform {name} in side panel: {}", e.message());
                    return self.console.report_failure(e, message);
                }
            };
        let devices = devices
            .into_iter()
            .map(|(path, status)| DeviceRecord { path, health: status.health, points: status.points })
            .collect();
        self.console.dispatch(Action::ReceiveDeviceStatuses { platform_uuid: uuid.to_string(), devices })?;

        let agents: Vec<Agent> =
            match self.console.request(RpcRequest::new(platform_method(uuid, "list_agents"))).await {
                Ok(agents) => agents,
                Err(e) => {
                    let message = format!("Unable to load agents for platform {name} in side panel: {}", e.message());
                    return self.console.report_failure(e, message);
                }
            };
        self.console.dispatch(Action::ReceiveAgentStatuses { platform_uuid: uuid.to_string(), agents })?;

        let performance: Vec<PerformanceRecord> =
            match self.console.request(RpcRequest::new("list_performance")).await {
                Ok(performance) => performance,
                Err(e) => {
                    let message = performance_message(name, &e);
                    return self.console.report_failure(e, message);
                }
            };
        let points = performance
            .iter()
            .find(|record| record.platform_uuid == uuid)
            .map(PerformanceRecord::points)
            .unwrap_or_default();
        self.console.dispatch(Action::ReceivePerformanceStats {
            parent_uuid: uuid.to_string(),
            parent_type: NodeType::Platform,
            points,
        })
    }

    /// Mark loading complete without waiting for calls in flight
    pub fn cancel_loading(&self, uuid: &str) -> Result<(), DispatchError> {
        self.console.dispatch(Action::CancelLoadingData { uuid: uuid.to_string() })
    }

    pub fn load_filtered_items(&self, term: &str, status: &str) -> Result<(), DispatchError> {
        self.console.dispatch(Action::FilterItems { term: term.to_string(), status: status.to_string() })
    }

    pub fn expand_all(&self, path: Vec<String>) -> Result<(), DispatchError> {
        self.console.dispatch(Action::ExpandAll { path })
    }

    pub fn toggle_item(&self, path: Vec<String>) -> Result<(), DispatchError> {
        self.console.dispatch(Action::ToggleItem { path })
    }

    pub fn check_item(&self, path: Vec<String>, checked: bool) -> Result<(), DispatchError> {
        self.console.dispatch(Action::CheckItem { path, checked })
    }

    /// Check or uncheck a point and add it to or remove it from its chart
    pub async fn check_point(&self, path: Vec<String>, checked: bool) -> Result<(), DispatchError> {
        let item = self.console.panel_items().read().get_item(&path).and_then(ChartItem::from_point);
        let Some(item) = item else {
            debug!(path = ?path, "check_point_not_a_point");
            return Ok(());
        };

        self.check_item(path, checked)?;
        let charts = self.console.platform_chart();
        if checked {
            charts.add_to_chart(item, None).await
        } else {
            charts.remove_from_chart(item).await
        }
    }
}

fn performance_message(name: &str, error: &RpcError) -> String {
    if error.is_historian_unavailable() {
        format!("Data could not be fetched for platform {name}. The historian agent is unavailable.")
    } else {
        error.message()
    }
}
