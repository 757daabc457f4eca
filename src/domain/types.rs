//! Core domain types shared by the stores and the RPC layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Health status reported by the server for platforms, agents and devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Good,
    Bad,
    Unknown,
}

impl Status {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Good => "GOOD",
            Status::Bad => "BAD",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// Human readable label shown next to the status
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Status::Good => "Healthy",
            Status::Bad => "Unhealthy",
            Status::Unknown => "Unknown Status",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognized is `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "GOOD" => Status::Good,
            "BAD" => Status::Bad,
            _ => Status::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Status::Unknown))
    }
}

/// Health block attached to platforms, agents and devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: Status,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Health {
    pub fn new(status: Status) -> Self {
        Self { status, context: None, last_updated: None }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Node type tag used by the panel tree and carried on chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Platform,
    Building,
    Device,
    Agent,
    Point,
    /// Grouping node (`agents`, `buildings`, `devices`, `points`)
    Type,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Platform => "platform",
            NodeType::Building => "building",
            NodeType::Device => "device",
            NodeType::Agent => "agent",
            NodeType::Point => "point",
            NodeType::Type => "type",
        }
    }
}

/// A registered platform as returned by `list_platforms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub uuid: String,
    pub name: String,
    /// `None` until the agent list has been fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<Agent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
}

impl Platform {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { uuid: uuid.into(), name: name.into(), agents: None, health: None }
    }

    pub fn with_health(mut self, health: Health) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_agents(mut self, agents: Vec<Agent>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn agent_mut(&mut self, agent_uuid: &str) -> Option<&mut Agent> {
        self.agents.as_mut()?.iter_mut().find(|a| a.uuid == agent_uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub process_id: Option<i64>,
    #[serde(default)]
    pub return_code: Option<i64>,
    #[serde(default, rename = "actionPending", skip_serializing_if = "Option::is_none")]
    pub action_pending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
}

impl Agent {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            tag: None,
            process_id: None,
            return_code: None,
            action_pending: None,
            health: None,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.process_id.is_some() && self.return_code.is_none()
    }
}

/// Process state as returned by `status_agents`, `start_agent` and `stop_agent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub process_id: Option<i64>,
    #[serde(default)]
    pub return_code: Option<i64>,
}

/// Agent package sent to `install`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFile {
    pub file_name: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstallResult {
    #[serde(default)]
    pub error: Option<String>,
}

/// One value of the `get_devices` map, keyed by `campus/building/device[/sub...]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceStatus {
    pub health: Health,
    #[serde(default)]
    pub points: Option<Vec<String>>,
}

/// A device record flattened from `get_devices`
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub path: String,
    pub health: Health,
    pub points: Option<Vec<String>>,
}

impl DeviceRecord {
    pub fn new(path: impl Into<String>, health: Health) -> Self {
        Self { path: path.into(), health, points: None }
    }

    pub fn with_points(mut self, points: &[&str]) -> Self {
        self.points = Some(points.iter().map(|p| p.to_string()).collect());
        self
    }
}

/// Entry of `list_performance`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerformanceRecord {
    #[serde(rename = "platform.uuid")]
    pub platform_uuid: String,
    pub performance: PerformanceTopics,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerformanceTopics {
    pub topic: String,
    #[serde(default)]
    pub points: Vec<String>,
}

/// A platform performance point ready to be attached to the panel tree
#[derive(Debug, Clone, PartialEq)]
pub struct PerformancePoint {
    pub topic: String,
    pub name: String,
}

impl PerformanceRecord {
    /// Expand the record into displayable points (`cpu / percent`, `a / b`)
    pub fn points(&self) -> Vec<PerformancePoint> {
        self.performance
            .points
            .iter()
            .map(|point| {
                let name = if point == "percent" {
                    "cpu / percent".to_string()
                } else {
                    point.replacen('/', " / ", 1)
                };
                PerformancePoint { topic: format!("{}/{}", self.performance.topic, point), name }
            })
            .collect()
    }
}

/// Historian topic available for charting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartTopic {
    pub path: String,
    pub name: String,
    /// Picker text, e.g. `temp (campus > b1 > d1)`
    pub label: String,
    /// Where the topic lives: the device path or the platform name
    pub parent_path: String,
    pub parent_uuid: String,
}

impl ChartTopic {
    /// Device point topic; every segment but the last forms the parent path
    pub fn from_path(path: impl Into<String>, parent_uuid: impl Into<String>) -> Self {
        let path = path.into();
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
        let parent_path = parent.split('/').collect::<Vec<_>>().join(" > ");
        let name = name.to_string();
        Self { label: format!("{name} ({parent_path})"), name, parent_path, parent_uuid: parent_uuid.into(), path }
    }
}

/// Severity of the status banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Success => "success",
            StatusKind::Error => "error",
        }
    }
}

/// One request/response exchange as seen by the console log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRecord {
    pub id: Uuid,
    pub method: String,
    /// Display copy of the request with redacted parameters
    pub request: serde_json::Value,
    pub initiated: DateTime<Utc>,
}
