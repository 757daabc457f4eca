//! Tree construction from server payloads

use super::status::rollup;
use super::{child_path, platform_path, PlatformsPanelItemsStore};
use crate::domain::panel::{GroupKind, NodeKind, PanelNode, PointInfo};
use crate::domain::types::{Agent, DeviceRecord, NodeType, PerformancePoint, Platform, Status};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const PERFORMANCE_GROUP: &str = "Performance";

/// Characters that may not appear in a point key
const TOPIC_UNSAFE: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '+', '-', '=', '[', ']', '{', '}', ';', '\'',
    ':', '"', '\\', '|', ',', ' ', '.', '<', '>', '/', '?',
];

/// Node-safe key for a topic
pub fn sanitize_topic(topic: &str) -> String {
    topic.chars().map(|c| if TOPIC_UNSAFE.contains(&c) { '_' } else { c }).collect()
}

/// A point to attach: display name and full topic
struct PointSpec {
    name: String,
    topic: String,
}

impl PlatformsPanelItemsStore {
    /// Drop the node at `path` and everything below it, detaching it from its parent
    fn remove_subtree(&mut self, path: &[String]) {
        let Some(node) = self.nodes.remove(path) else {
            return;
        };
        if let Some((key, parent)) = path.split_last() {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.children.retain(|k| k != key);
            }
        }
        self.remove_descendants(path, &node.children);
    }

    /// Walk `children` of the node at `path`, removing every node reached
    fn remove_descendants(&mut self, path: &[String], children: &[String]) {
        let mut pending: Vec<Vec<String>> = children.iter().map(|key| child_path(path, key)).collect();
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next.as_slice()) {
                pending.extend(node.children.iter().map(|key| child_path(&next, key)));
            }
        }
    }

    /// Insert `node` at its path, replacing any previous subtree there.
    /// A replaced node keeps its place among its siblings.
    fn insert_child(&mut self, node: PanelNode) {
        let Some((key, parent)) = node.path.split_last() else {
            return;
        };
        match self.nodes.remove(node.path.as_slice()) {
            Some(previous) => self.remove_descendants(&node.path, &previous.children),
            None => {
                if let Some(parent) = self.nodes.get_mut(parent) {
                    parent.children.push(key.clone());
                }
            }
        }
        self.nodes.insert(node.path.clone(), node);
    }

    /// Path of the `kind` group under `parent`, creating it if missing
    fn ensure_group(&mut self, parent: &[String], kind: GroupKind, name: &str) -> Vec<String> {
        let path = child_path(parent, kind.key());
        if !self.nodes.contains_key(path.as_slice()) {
            self.insert_child(PanelNode::group(kind, name, path.clone()));
        }
        path
    }

    fn set_status(&mut self, path: &[String], status: Option<Status>, context: Option<String>) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.status = status;
            node.context = context;
        }
    }

    /// Names of the non-group nodes along `path`, joined with ` > `
    fn display_path(&self, path: &[String]) -> String {
        (2..=path.len())
            .filter_map(|end| self.nodes.get(&path[..end]))
            .filter(|node| node.kind != NodeKind::Group)
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }

    pub(super) fn receive_platform_statuses(&mut self, platforms: &[Platform]) {
        for platform in platforms {
            let (status, context) = match &platform.health {
                Some(health) => (health.status, health.context.clone()),
                None => (Status::Unknown, None),
            };
            let mut node = PanelNode::new(
                NodeKind::Platform,
                &platform.uuid,
                &platform.name,
                platform_path(&platform.uuid),
            )
            .with_status(Some(status), context);
            node.expanded = None;

            self.remove_subtree(&node.path);
            self.nodes.insert(node.path.clone(), node);
        }

        let listed: Vec<String> = platforms.iter().map(|p| p.uuid.clone()).collect();
        let gone: Vec<String> =
            self.platforms.iter().filter(|uuid| !listed.contains(uuid)).cloned().collect();
        for uuid in &gone {
            self.remove_subtree(&platform_path(uuid));
            self.loading_complete.remove(uuid);
            debug!(platform = %uuid, "platform_removed_from_panel");
        }
        self.platforms = listed;
    }

    pub(super) fn insert_agents(&mut self, platform_uuid: &str, agents: &[Agent]) {
        let platform = platform_path(platform_uuid);
        if !self.nodes.contains_key(platform.as_slice()) {
            warn!(platform = %platform_uuid, "agents_for_unknown_platform");
            return;
        }

        // The agents group is rebuilt from scratch on every update
        self.remove_subtree(&child_path(&platform, GroupKind::Agents.key()));
        let group = self.ensure_group(&platform, GroupKind::Agents, GroupKind::Agents.name());

        for agent in agents {
            let (status, context) = match &agent.health {
                Some(health) => (health.status, health.context.clone()),
                None => (Status::Unknown, None),
            };
            let mut node = PanelNode::new(
                NodeKind::Agent { process_id: agent.process_id, return_code: agent.return_code },
                &agent.uuid,
                &agent.name,
                child_path(&group, &agent.uuid),
            )
            .with_status(Some(status), context);
            node.expanded = None;
            self.insert_child(node);
        }

        let status = self.rollup_children(&group);
        self.set_status(&group, status, None);
        debug!(platform = %platform_uuid, agents = agents.len(), status = ?status, "panel_agents_inserted");
    }

    pub(super) fn insert_devices(&mut self, platform_uuid: &str, devices: &[DeviceRecord]) {
        let platform = platform_path(platform_uuid);
        if !self.nodes.contains_key(platform.as_slice()) {
            warn!(platform = %platform_uuid, "devices_for_unknown_platform");
            return;
        }

        // Parents before children, whatever order the server used
        let mut by_depth: BTreeMap<usize, Vec<&DeviceRecord>> = BTreeMap::new();
        for device in devices {
            let depth = device.path.split('/').count();
            if depth < 3 {
                warn!(platform = %platform_uuid, path = %device.path, "device_path_too_short");
                continue;
            }
            by_depth.entry(depth).or_default().push(device);
        }

        let mut touched: Vec<Vec<String>> = Vec::new();
        for (depth, level) in by_depth {
            for device in level {
                let parts: Vec<&str> = device.path.split('/').collect();
                let building = self.ensure_building(&platform, &parts);
                let inserted = if depth == 3 {
                    self.insert_top_level_device(&building, device, &parts);
                    true
                } else {
                    self.insert_sub_device(&building, device, &parts)
                };
                if inserted && !touched.contains(&building) {
                    touched.push(building);
                }
            }
        }

        for building in &touched {
            let devices_group = child_path(building, GroupKind::Devices.key());
            let status = self.rollup_children(&devices_group);
            self.set_status(&devices_group, status, None);
            if let Some(node) = self.nodes.get_mut(building.as_slice()) {
                node.status = status;
            }
        }

        let status = rollup(touched.iter().map(|b| self.status_at(b)));
        let buildings_group = child_path(&platform, GroupKind::Buildings.key());
        self.set_status(&buildings_group, status, None);
        debug!(platform = %platform_uuid, devices = devices.len(), buildings = touched.len(), "panel_devices_inserted");
    }

    /// Building node for `campus/building/...`, created with its devices group
    fn ensure_building(&mut self, platform: &[String], parts: &[&str]) -> Vec<String> {
        let buildings = self.ensure_group(platform, GroupKind::Buildings, GroupKind::Buildings.name());
        let uuid = format!("{}_{}", parts[0], parts[1]);
        let path = child_path(&buildings, &uuid);
        if !self.nodes.contains_key(path.as_slice()) {
            let node = PanelNode::new(
                NodeKind::Building { legend_info: format!("{} > {}", parts[0], parts[1]) },
                &uuid,
                parts[1],
                path.clone(),
            )
            .with_status(Some(Status::Unknown), None);
            self.insert_child(node);
            self.ensure_group(&path, GroupKind::Devices, GroupKind::Devices.name());
        }
        path
    }

    fn device_node(parent_legend: &str, device: &DeviceRecord, parts: &[&str], group: &[String]) -> PanelNode {
        let name = parts[parts.len() - 1];
        let uuid = device.path.replace('/', "_");
        PanelNode::new(
            NodeKind::Device { legend_info: format!("{parent_legend} > {name}") },
            &uuid,
            name,
            child_path(group, &uuid),
        )
        .with_status(Some(device.health.status), device.health.context.clone())
    }

    fn insert_top_level_device(&mut self, building: &[String], device: &DeviceRecord, parts: &[&str]) {
        let group = child_path(building, GroupKind::Devices.key());
        let legend = format!("{} > {}", parts[0], parts[1]);
        let node = Self::device_node(&legend, device, parts, &group);
        let path = node.path.clone();
        self.insert_child(node);
        self.attach_device_points(&path, device);
    }

    /// Attach `a/b/d/sub...` under its parent device; false if the parent is missing
    fn insert_sub_device(&mut self, building: &[String], device: &DeviceRecord, parts: &[&str]) -> bool {
        let mut parent = building.to_vec();
        for depth in 3..parts.len() {
            let ancestor = parts[..depth].join("_");
            parent = child_path(&child_path(&parent, GroupKind::Devices.key()), &ancestor);
        }

        let Some(parent_node) = self.nodes.get(parent.as_slice()) else {
            warn!(path = %device.path, "device_parent_missing");
            return false;
        };
        let parent_legend = parent_node.legend_info().unwrap_or(parent_node.name.as_str()).to_string();

        let group = child_path(&parent, GroupKind::Devices.key());
        if !self.nodes.contains_key(group.as_slice()) {
            self.ensure_group(&parent, GroupKind::Devices, GroupKind::Devices.name());
            self.set_status(&group, Some(device.health.status), device.health.context.clone());
        }

        let node = Self::device_node(&parent_legend, device, parts, &group);
        let path = node.path.clone();
        self.insert_child(node);
        self.attach_device_points(&path, device);

        let siblings = self.nodes.get(group.as_slice()).map_or(0, |g| g.children.len());
        if siblings > 1 {
            self.update_device_group_status(&parent);
        }
        true
    }

    fn attach_device_points(&mut self, device_path: &[String], device: &DeviceRecord) {
        let Some(points) = &device.points else {
            return;
        };
        let entries = points
            .iter()
            .map(|name| PointSpec { name: name.clone(), topic: format!("{}/{}", device.path, name) })
            .collect();
        self.attach_points(device_path, GroupKind::Points.name(), entries);
    }

    /// Attach a points group to the node at `owner`; points inherit its status
    fn attach_points(&mut self, owner: &[String], group_name: &str, points: Vec<PointSpec>) {
        let Some(node) = self.nodes.get(owner) else {
            return;
        };
        let status = node.status;
        let context = node.context.clone();
        let parent_type = node.node_type();
        let parent_path = match node.legend_info() {
            Some(legend) => legend.to_string(),
            None => self.display_path(owner),
        };
        let parent_uuid = owner.get(1).cloned().unwrap_or_default();

        let checked: Vec<bool> = {
            let charts = self.charts.read();
            points.iter().map(|p| charts.get_topic_in_charts(&p.topic, &p.name)).collect()
        };

        let group = self.ensure_group(owner, GroupKind::Points, group_name);
        self.set_status(&group, status, context.clone());

        for (point, checked) in points.into_iter().zip(checked) {
            let uuid = sanitize_topic(&point.topic);
            let mut node = PanelNode::new(
                NodeKind::Point(PointInfo {
                    topic: point.topic,
                    parent_uuid: parent_uuid.clone(),
                    parent_type,
                    parent_path: parent_path.clone(),
                    checked,
                }),
                &uuid,
                point.name,
                child_path(&group, &uuid),
            )
            .with_status(status, context.clone());
            node.expanded = None;
            self.insert_child(node);
        }
    }

    pub(super) fn insert_performance_points(
        &mut self,
        parent_uuid: &str,
        parent_type: NodeType,
        points: &[PerformancePoint],
    ) -> bool {
        if parent_type != NodeType::Platform {
            debug!(parent = %parent_uuid, parent_type = parent_type.as_str(), "performance_points_ignored");
            return false;
        }
        let platform = platform_path(parent_uuid);
        if points.is_empty() || !self.nodes.contains_key(platform.as_slice()) {
            return false;
        }

        self.remove_subtree(&child_path(&platform, GroupKind::Points.key()));
        if let Some(node) = self.nodes.get_mut(platform.as_slice()) {
            node.expanded = Some(true);
        }
        let entries = points
            .iter()
            .map(|p| PointSpec { name: p.name.clone(), topic: p.topic.clone() })
            .collect();
        self.attach_points(&platform, PERFORMANCE_GROUP, entries);
        debug!(platform = %parent_uuid, points = points.len(), "panel_performance_points_inserted");
        true
    }
}
