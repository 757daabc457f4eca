//! Domain models - the data the console stores hold
//!
//! This module contains the canonical data types used throughout the crate:
//! - `types` - platforms, agents, devices, health status and exchange records
//! - `chart` - charts, series, samples and the color pool
//! - `panel` - platforms-panel tree nodes
//! - `action` - the closed set of actions carried by the dispatcher

pub mod action;
pub mod chart;
pub mod panel;
pub mod types;

// Re-export commonly used types at module level
pub use action::{Action, ActionType, ChartItem};
pub use chart::{Chart, ChartSeries, ChartType, ColorAssignment, ColorName, ColorPool, SampleTime, TimedSample};
pub use panel::{GroupKind, NodeKind, PanelNode, PointInfo};
pub use types::{
    Agent, AgentFile, AgentStatus, ChartTopic, DeviceRecord, DeviceStatus, ExchangeRecord, Health,
    InstallResult, NodeType, PerformancePoint, PerformanceRecord, Platform, Status, StatusKind,
};
