//! Platforms-panel tree nodes

use crate::domain::types::{NodeType, Status};
use serde::Serialize;

/// Variant-specific payload of a panel node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Platform,
    /// Grouping node (`agents`, `buildings`, `devices`, `points`)
    Group,
    Building {
        legend_info: String,
    },
    Device {
        legend_info: String,
    },
    Agent {
        process_id: Option<i64>,
        return_code: Option<i64>,
    },
    Point(PointInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointInfo {
    pub topic: String,
    pub parent_uuid: String,
    pub parent_type: NodeType,
    pub parent_path: String,
    pub checked: bool,
}

/// Grouping keys and their fixed sibling order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Points,
    Devices,
    Buildings,
    Agents,
}

impl GroupKind {
    pub fn key(&self) -> &'static str {
        match self {
            GroupKind::Points => "points",
            GroupKind::Devices => "devices",
            GroupKind::Buildings => "buildings",
            GroupKind::Agents => "agents",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GroupKind::Points => "Points",
            GroupKind::Devices => "Devices",
            GroupKind::Buildings => "Buildings",
            GroupKind::Agents => "Agents",
        }
    }

    pub fn sort_order(&self) -> u8 {
        match self {
            GroupKind::Points => 0,
            GroupKind::Devices => 1,
            GroupKind::Buildings => 2,
            GroupKind::Agents => 3,
        }
    }
}

/// A node of the panel tree; `path` is its only address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelNode {
    pub uuid: String,
    pub name: String,
    pub path: Vec<String>,
    pub status: Option<Status>,
    pub context: Option<String>,
    pub visible: bool,
    /// `None` = not loaded yet (platforms) or a true leaf
    pub expanded: Option<bool>,
    pub children: Vec<String>,
    pub sort_order: u8,
    pub kind: NodeKind,
}

impl PanelNode {
    pub fn new(kind: NodeKind, uuid: impl Into<String>, name: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            path,
            status: None,
            context: None,
            visible: true,
            expanded: Some(false),
            children: Vec::new(),
            sort_order: 0,
            kind,
        }
    }

    pub fn group(group: GroupKind, name: impl Into<String>, path: Vec<String>) -> Self {
        let mut node = Self::new(NodeKind::Group, group.key(), name, path);
        node.sort_order = group.sort_order();
        node
    }

    pub fn with_status(mut self, status: Option<Status>, context: Option<String>) -> Self {
        self.status = status;
        self.context = context;
        self
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Platform => NodeType::Platform,
            NodeKind::Group => NodeType::Type,
            NodeKind::Building { .. } => NodeType::Building,
            NodeKind::Device { .. } => NodeType::Device,
            NodeKind::Agent { .. } => NodeType::Agent,
            NodeKind::Point(_) => NodeType::Point,
        }
    }

    #[inline]
    pub fn status_label(&self) -> Option<&'static str> {
        self.status.map(|s| s.label())
    }

    pub fn legend_info(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Building { legend_info } | NodeKind::Device { legend_info } => Some(legend_info),
            _ => None,
        }
    }

    pub fn point(&self) -> Option<&PointInfo> {
        match &self.kind {
            NodeKind::Point(info) => Some(info),
            _ => None,
        }
    }

    pub fn point_mut(&mut self) -> Option<&mut PointInfo> {
        match &mut self.kind {
            NodeKind::Point(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Field lookup used by `key:value` filter terms
    pub fn field(&self, key: &str) -> Option<String> {
        let point = self.point();
        match key {
            "name" => Some(self.name.clone()),
            "uuid" => Some(self.uuid.clone()),
            "type" => Some(self.node_type().as_str().to_string()),
            "status" => self.status.map(|s| s.as_str().to_string()),
            "statusLabel" => self.status_label().map(str::to_string),
            "context" => self.context.clone(),
            "legendInfo" => self.legend_info().map(str::to_string),
            "topic" => point.map(|p| p.topic.clone()),
            "parentUuid" => point.map(|p| p.parent_uuid.clone()),
            "parentType" => point.map(|p| p.parent_type.as_str().to_string()),
            "parentPath" => point.map(|p| p.parent_path.clone()),
            _ => None,
        }
    }
}
