//! Term/status filtering and expand/collapse of the panel tree

use super::{child_path, platform_path, PlatformsPanelItemsStore};
use crate::domain::panel::PanelNode;
use tracing::debug;

/// Parsed `FILTER_ITEMS` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFilter {
    /// Both inputs empty: show everything, collapse groups
    Reset,
    /// Case-insensitive substring on `name`, or on `field` for `field:value`
    Term { field: Option<String>, needle: String },
    /// Exact status match; nodes without a status match only `UNKNOWN`
    Status(String),
}

impl ItemFilter {
    /// A non-empty term takes precedence over the status
    pub fn parse(term: &str, status: &str) -> Self {
        if !term.is_empty() {
            let first_word = term.split(' ').next().unwrap_or_default();
            if first_word.contains(':') {
                if let Some((field, value)) = term.split_once(':') {
                    return ItemFilter::Term { field: Some(field.to_string()), needle: value.to_string() };
                }
            }
            return ItemFilter::Term { field: None, needle: term.to_string() };
        }
        if !status.is_empty() {
            return ItemFilter::Status(status.to_string());
        }
        ItemFilter::Reset
    }

    pub fn matches(&self, node: &PanelNode) -> bool {
        match self {
            ItemFilter::Reset => true,
            ItemFilter::Term { field, needle } => {
                let value = match field {
                    Some(field) => node.field(field),
                    None => Some(node.name.clone()),
                };
                value.is_some_and(|v| {
                    v.to_uppercase().trim().contains(needle.to_uppercase().trim())
                })
            }
            ItemFilter::Status(wanted) => match node.status {
                Some(status) => status.as_str() == wanted,
                None => wanted == "UNKNOWN",
            },
        }
    }
}

impl PlatformsPanelItemsStore {
    pub(super) fn load_filtered_items(&mut self, term: &str, status: &str) {
        let filter = ItemFilter::parse(term, status);
        let platforms = self.platforms.clone();
        for uuid in &platforms {
            let path = platform_path(uuid);
            match filter {
                ItemFilter::Reset => self.expand_all_children(&path, false),
                _ => {
                    self.filter_node(&path, &filter);
                }
            }
        }
        debug!(filter = ?filter, platforms = platforms.len(), "panel_items_filtered");
    }

    /// Apply `filter` below `path`; returns whether the node stays visible
    fn filter_node(&mut self, path: &[String], filter: &ItemFilter) -> bool {
        let Some(node) = self.nodes.get(path) else {
            return false;
        };
        let matched = filter.matches(node);
        let children = node.children.clone();

        if children.is_empty() {
            if let Some(node) = self.nodes.get_mut(path) {
                node.visible = matched;
                node.expanded = None;
            }
            return matched;
        }

        let hidden = children
            .iter()
            .map(|key| self.filter_node(&child_path(path, key), filter))
            .filter(|visible| !visible)
            .count();

        let Some(node) = self.nodes.get_mut(path) else {
            return false;
        };
        if hidden == children.len() {
            node.visible = matched;
            node.expanded = Some(false);
        } else {
            node.visible = true;
            node.expanded = Some(true);
        }
        node.visible
    }

    /// Show every node below `path`; groups get `expanded`, leaves `None`
    pub(super) fn expand_all_children(&mut self, path: &[String], expanded: bool) {
        let Some(node) = self.nodes.get(path) else {
            return;
        };
        let children = node.children.clone();
        for key in &children {
            self.expand_all_children(&child_path(path, key), expanded);
        }
        if let Some(node) = self.nodes.get_mut(path) {
            node.visible = true;
            node.expanded = if children.is_empty() { None } else { Some(expanded) };
        }
    }

    /// Toggle the node at `path` and set its whole subtree to match
    pub(super) fn expand_all(&mut self, path: &[String]) {
        let Some(node) = self.nodes.get(path) else {
            return;
        };
        let expanded = match node.expanded {
            Some(expanded) => !expanded,
            None => true,
        };
        self.expand_all_children(path, expanded);
    }
}
