//! Platforms-panel item tree
//!
//! The tree is an arena of `PanelNode`s keyed by path. The root key is
//! `platforms`; a platform lives at `["platforms", uuid]` and everything below
//! it is reached through the `children` keys of each node:
//! - `tree` - building the tree from agent, device and performance payloads
//! - `status` - health rollup from children to parents
//! - `filter` - term/status filtering and expand/collapse

mod filter;
mod status;
mod tree;
#[cfg(test)]
mod tests;

pub use filter::ItemFilter;
pub use status::{fold_status, rollup};

use crate::domain::action::Action;
use crate::domain::panel::PanelNode;
use crate::infra::store::{Store, StoreHandle};
use crate::services::platform_chart_store::PlatformChartStore;
use rustc_hash::FxHashMap;
use tracing::debug;

pub const ROOT: &str = "platforms";

/// Path of `key` under `parent`
pub fn child_path(parent: &[String], key: &str) -> Vec<String> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(key.to_string());
    path
}

pub fn platform_path(uuid: &str) -> Vec<String> {
    vec![ROOT.to_string(), uuid.to_string()]
}

pub struct PlatformsPanelItemsStore {
    nodes: FxHashMap<Vec<String>, PanelNode>,
    /// Platform uuids in the order the server listed them
    platforms: Vec<String>,
    loading_complete: FxHashMap<String, bool>,
    last_check: bool,
    charts: StoreHandle<PlatformChartStore>,
}

impl PlatformsPanelItemsStore {
    pub fn new(charts: StoreHandle<PlatformChartStore>) -> Self {
        Self {
            nodes: FxHashMap::default(),
            platforms: Vec::new(),
            loading_complete: FxHashMap::default(),
            last_check: false,
            charts,
        }
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.platforms.clear();
        self.loading_complete.clear();
        self.last_check = false;
    }

    pub fn get_item(&self, path: &[String]) -> Option<&PanelNode> {
        self.nodes.get(path)
    }

    /// Platform nodes in server order
    pub fn get_platforms(&self) -> Vec<&PanelNode> {
        self.platforms
            .iter()
            .filter_map(|uuid| self.nodes.get(platform_path(uuid).as_slice()))
            .collect()
    }

    /// Children of the node at `path` in insertion order
    pub fn get_children(&self, path: &[String]) -> Vec<&PanelNode> {
        let Some(node) = self.nodes.get(path) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|key| self.nodes.get(child_path(path, key).as_slice()))
            .collect()
    }

    /// Children ordered by group sort order, then insertion order
    pub fn get_children_sorted(&self, path: &[String]) -> Vec<&PanelNode> {
        let mut children = self.get_children(path);
        children.sort_by_key(|node| node.sort_order);
        children
    }

    /// Path of the point charting `topic`, if it is in the tree
    pub fn find_topic_in_tree(&self, topic: &str) -> Option<Vec<String>> {
        self.nodes
            .values()
            .find(|node| node.point().is_some_and(|p| p.topic == topic))
            .map(|node| node.path.clone())
    }

    /// `None` until loading has started for the platform
    pub fn get_loading_complete(&self, uuid: &str) -> Option<bool> {
        self.loading_complete.get(uuid).copied()
    }

    pub fn get_last_check(&self) -> bool {
        self.last_check
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn check_item(&mut self, path: &[String], checked: bool) -> bool {
        let Some(point) = self.nodes.get_mut(path).and_then(PanelNode::point_mut) else {
            debug!(path = ?path, "check_item_not_a_point");
            return false;
        };
        point.checked = checked;
        self.last_check = checked;
        true
    }

    fn toggle_item(&mut self, path: &[String]) -> bool {
        match self.nodes.get_mut(path) {
            Some(node) => {
                node.expanded = Some(!node.expanded.unwrap_or(false));
                true
            }
            None => false,
        }
    }

    fn end_loading(&mut self, uuid: &str) {
        self.loading_complete.insert(uuid.to_string(), true);
        self.update_platform_status(uuid);
        if let Some(platform) = self.nodes.get_mut(platform_path(uuid).as_slice()) {
            if !platform.children.is_empty() {
                platform.expanded = Some(true);
            }
        }
    }
}

impl Store for PlatformsPanelItemsStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::ClearAuthorization => {
                self.reset();
                true
            }
            Action::FilterItems { term, status } => {
                self.load_filtered_items(term, status);
                self.last_check = false;
                true
            }
            Action::ExpandAll { path } => {
                self.expand_all(path);
                self.last_check = false;
                true
            }
            Action::ToggleItem { path } => {
                self.last_check = false;
                self.toggle_item(path)
            }
            Action::CheckItem { path, checked } => self.check_item(path, *checked),
            Action::StartLoadingData { uuid } => {
                self.loading_complete.insert(uuid.clone(), false);
                self.last_check = false;
                true
            }
            Action::CancelLoadingData { uuid } => {
                self.loading_complete.insert(uuid.clone(), true);
                true
            }
            Action::EndLoadingData { uuid } => {
                self.end_loading(uuid);
                self.last_check = false;
                true
            }
            Action::ReceivePlatformStatuses { platforms } => {
                self.receive_platform_statuses(platforms);
                self.last_check = false;
                true
            }
            Action::ReceiveAgentStatuses { platform_uuid, agents } => {
                if agents.is_empty() {
                    return false;
                }
                self.insert_agents(platform_uuid, agents);
                true
            }
            Action::ReceiveDeviceStatuses { platform_uuid, devices } => {
                if devices.is_empty() {
                    return false;
                }
                self.insert_devices(platform_uuid, devices);
                true
            }
            Action::ReceivePerformanceStats { parent_uuid, parent_type, points } => {
                self.insert_performance_points(parent_uuid, *parent_type, points)
            }
            _ => false,
        }
    }
}
