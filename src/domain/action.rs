//! Actions carried by the dispatcher
//!
//! `Action` is a closed sum type; `ActionType` is its payload-free tag used for
//! logging and for parsing action names coming from outside the crate.

use crate::domain::chart::{Chart, ChartSeries, ChartType, TimedSample};
use crate::domain::panel::PanelNode;
use crate::domain::types::{
    Agent, ChartTopic, DeviceRecord, ExchangeRecord, NodeType, PerformancePoint, Platform,
    StatusKind,
};
use crate::infra::dispatcher::DispatchError;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Chart payload for add/remove/refresh, built from a panel point or an existing series
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartItem {
    /// Chart key
    pub name: String,
    pub uuid: String,
    pub path: Vec<String>,
    pub parent_uuid: String,
    pub parent_type: Option<NodeType>,
    pub parent_path: String,
    pub topic: String,
    pub data: Option<Vec<TimedSample>>,
    pub refresh_interval: Option<u64>,
    pub data_length: Option<usize>,
    pub pinned: Option<bool>,
    pub chart_type: Option<ChartType>,
}

impl ChartItem {
    /// Chart item for a panel point; `None` for any other node
    pub fn from_point(node: &PanelNode) -> Option<Self> {
        let point = node.point()?;
        Some(Self {
            name: node.name.clone(),
            uuid: node.uuid.clone(),
            path: node.path.clone(),
            parent_uuid: point.parent_uuid.clone(),
            parent_type: Some(point.parent_type),
            parent_path: point.parent_path.clone(),
            topic: point.topic.clone(),
            ..Default::default()
        })
    }

    pub fn from_series(chart_key: &str, series: &ChartSeries) -> Self {
        Self {
            name: chart_key.to_string(),
            uuid: series.uuid.clone(),
            path: series.path.clone(),
            parent_uuid: series.parent_uuid.clone(),
            parent_type: series.parent_type,
            parent_path: series.parent_path.clone(),
            topic: series.topic.clone(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: Vec<TimedSample>) -> Self {
        self.data = Some(data);
        self
    }

    /// Stamp every sample with this item's identity
    pub fn decorate(&self, samples: Vec<TimedSample>) -> Vec<TimedSample> {
        samples
            .into_iter()
            .map(|mut sample| {
                sample.name = Some(self.name.clone());
                sample.parent = Some(self.parent_path.clone());
                sample.uuid = Some(self.uuid.clone());
                sample
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // RPC exchange
    MakeRequest { exchange: ExchangeRecord },
    ReceiveResponse { exchange_id: Uuid, elapsed_ms: u64, error: Option<String> },
    FailRequest { exchange_id: Uuid, elapsed_ms: u64, error: String },

    // Authorization
    ReceiveAuthorization { token: String, username: String },
    ReceiveUnauthorized { error: String },
    ClearAuthorization,

    // Platforms
    ReceivePlatforms { platforms: Vec<Platform> },
    ReceivePlatform { platform: Platform },
    ReceivePlatformStatuses { platforms: Vec<Platform> },

    // Platforms panel
    TogglePlatformsPanel,
    ReceiveAgentStatuses { platform_uuid: String, agents: Vec<Agent> },
    ReceiveDeviceStatuses { platform_uuid: String, devices: Vec<DeviceRecord> },
    ReceivePerformanceStats { parent_uuid: String, parent_type: NodeType, points: Vec<PerformancePoint> },
    StartLoadingData { uuid: String },
    EndLoadingData { uuid: String },
    CancelLoadingData { uuid: String },
    ExpandAll { path: Vec<String> },
    ToggleItem { path: Vec<String> },
    CheckItem { path: Vec<String>, checked: bool },
    FilterItems { term: String, status: String },

    // Charts
    ShowCharts { emit_change: bool },
    AddToChart { item: ChartItem },
    RemoveFromChart { item: ChartItem },
    RefreshChart { item: ChartItem },
    PinChart { chart_key: String },
    ChangeChartType { chart_key: String, chart_type: ChartType },
    ChangeChartRefresh { chart_key: String, rate: Option<u64> },
    ChangeChartLength { chart_key: String, length: usize },
    RemoveChart { chart_key: String },
    LoadCharts { charts: Vec<Chart> },
    ReceiveChartTopics { platform_uuid: String, topics: Vec<ChartTopic> },

    // Status banner
    OpenStatus { status: StatusKind, message: String },
    CloseStatus,
}

/// Payload-free tag of every `Action` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    MakeRequest,
    ReceiveResponse,
    FailRequest,
    ReceiveAuthorization,
    ReceiveUnauthorized,
    ClearAuthorization,
    ReceivePlatforms,
    ReceivePlatform,
    ReceivePlatformStatuses,
    TogglePlatformsPanel,
    ReceiveAgentStatuses,
    ReceiveDeviceStatuses,
    ReceivePerformanceStats,
    StartLoadingData,
    EndLoadingData,
    CancelLoadingData,
    ExpandAll,
    ToggleItem,
    CheckItem,
    FilterItems,
    ShowCharts,
    AddToChart,
    RemoveFromChart,
    RefreshChart,
    PinChart,
    ChangeChartType,
    ChangeChartRefresh,
    ChangeChartLength,
    RemoveChart,
    LoadCharts,
    ReceiveChartTopics,
    OpenStatus,
    CloseStatus,
}

impl ActionType {
    pub const ALL: [ActionType; 33] = [
        ActionType::MakeRequest,
        ActionType::ReceiveResponse,
        ActionType::FailRequest,
        ActionType::ReceiveAuthorization,
        ActionType::ReceiveUnauthorized,
        ActionType::ClearAuthorization,
        ActionType::ReceivePlatforms,
        ActionType::ReceivePlatform,
        ActionType::ReceivePlatformStatuses,
        ActionType::TogglePlatformsPanel,
        ActionType::ReceiveAgentStatuses,
        ActionType::ReceiveDeviceStatuses,
        ActionType::ReceivePerformanceStats,
        ActionType::StartLoadingData,
        ActionType::EndLoadingData,
        ActionType::CancelLoadingData,
        ActionType::ExpandAll,
        ActionType::ToggleItem,
        ActionType::CheckItem,
        ActionType::FilterItems,
        ActionType::ShowCharts,
        ActionType::AddToChart,
        ActionType::RemoveFromChart,
        ActionType::RefreshChart,
        ActionType::PinChart,
        ActionType::ChangeChartType,
        ActionType::ChangeChartRefresh,
        ActionType::ChangeChartLength,
        ActionType::RemoveChart,
        ActionType::LoadCharts,
        ActionType::ReceiveChartTopics,
        ActionType::OpenStatus,
        ActionType::CloseStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::MakeRequest => "MAKE_REQUEST",
            ActionType::ReceiveResponse => "RECEIVE_RESPONSE",
            ActionType::FailRequest => "FAIL_REQUEST",
            ActionType::ReceiveAuthorization => "RECEIVE_AUTHORIZATION",
            ActionType::ReceiveUnauthorized => "RECEIVE_UNAUTHORIZED",
            ActionType::ClearAuthorization => "CLEAR_AUTHORIZATION",
            ActionType::ReceivePlatforms => "RECEIVE_PLATFORMS",
            ActionType::ReceivePlatform => "RECEIVE_PLATFORM",
            ActionType::ReceivePlatformStatuses => "RECEIVE_PLATFORM_STATUSES",
            ActionType::TogglePlatformsPanel => "TOGGLE_PLATFORMS_PANEL",
            ActionType::ReceiveAgentStatuses => "RECEIVE_AGENT_STATUSES",
            ActionType::ReceiveDeviceStatuses => "RECEIVE_DEVICE_STATUSES",
            ActionType::ReceivePerformanceStats => "RECEIVE_PERFORMANCE_STATS",
            ActionType::StartLoadingData => "START_LOADING_DATA",
            ActionType::EndLoadingData => "END_LOADING_DATA",
            ActionType::CancelLoadingData => "CANCEL_LOADING_DATA",
            ActionType::ExpandAll => "EXPAND_ALL",
            ActionType::ToggleItem => "TOGGLE_ITEM",
            ActionType::CheckItem => "CHECK_ITEM",
            ActionType::FilterItems => "FILTER_ITEMS",
            ActionType::ShowCharts => "SHOW_CHARTS",
            ActionType::AddToChart => "ADD_TO_CHART",
            ActionType::RemoveFromChart => "REMOVE_FROM_CHART",
            ActionType::RefreshChart => "REFRESH_CHART",
            ActionType::PinChart => "PIN_CHART",
            ActionType::ChangeChartType => "CHANGE_CHART_TYPE",
            ActionType::ChangeChartRefresh => "CHANGE_CHART_REFRESH",
            ActionType::ChangeChartLength => "CHANGE_CHART_LENGTH",
            ActionType::RemoveChart => "REMOVE_CHART",
            ActionType::LoadCharts => "LOAD_CHARTS",
            ActionType::ReceiveChartTopics => "RECEIVE_CHART_TOPICS",
            ActionType::OpenStatus => "OPEN_STATUS",
            ActionType::CloseStatus => "CLOSE_STATUS",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownActionType(s.to_string()))
    }
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::MakeRequest { .. } => ActionType::MakeRequest,
            Action::ReceiveResponse { .. } => ActionType::ReceiveResponse,
            Action::FailRequest { .. } => ActionType::FailRequest,
            Action::ReceiveAuthorization { .. } => ActionType::ReceiveAuthorization,
            Action::ReceiveUnauthorized { .. } => ActionType::ReceiveUnauthorized,
            Action::ClearAuthorization => ActionType::ClearAuthorization,
            Action::ReceivePlatforms { .. } => ActionType::ReceivePlatforms,
            Action::ReceivePlatform { .. } => ActionType::ReceivePlatform,
            Action::ReceivePlatformStatuses { .. } => ActionType::ReceivePlatformStatuses,
            Action::TogglePlatformsPanel => ActionType::TogglePlatformsPanel,
            Action::ReceiveAgentStatuses { .. } => ActionType::ReceiveAgentStatuses,
            Action::ReceiveDeviceStatuses { .. } => ActionType::ReceiveDeviceStatuses,
            Action::ReceivePerformanceStats { .. } => ActionType::ReceivePerformanceStats,
            Action::StartLoadingData { .. } => ActionType::StartLoadingData,
            Action::EndLoadingData { .. } => ActionType::EndLoadingData,
            Action::CancelLoadingData { .. } => ActionType::CancelLoadingData,
            Action::ExpandAll { .. } => ActionType::ExpandAll,
            Action::ToggleItem { .. } => ActionType::ToggleItem,
            Action::CheckItem { .. } => ActionType::CheckItem,
            Action::FilterItems { .. } => ActionType::FilterItems,
            Action::ShowCharts { .. } => ActionType::ShowCharts,
            Action::AddToChart { .. } => ActionType::AddToChart,
            Action::RemoveFromChart { .. } => ActionType::RemoveFromChart,
            Action::RefreshChart { .. } => ActionType::RefreshChart,
            Action::PinChart { .. } => ActionType::PinChart,
            Action::ChangeChartType { .. } => ActionType::ChangeChartType,
            Action::ChangeChartRefresh { .. } => ActionType::ChangeChartRefresh,
            Action::ChangeChartLength { .. } => ActionType::ChangeChartLength,
            Action::RemoveChart { .. } => ActionType::RemoveChart,
            Action::LoadCharts { .. } => ActionType::LoadCharts,
            Action::ReceiveChartTopics { .. } => ActionType::ReceiveChartTopics,
            Action::OpenStatus { .. } => ActionType::OpenStatus,
            Action::CloseStatus => ActionType::CloseStatus,
        }
    }
}
