//! Health rollup
//!
//! `fold_status` is a left fold: an absent accumulator takes the child, an
//! UNKNOWN accumulator is promoted by a BAD child, a GOOD accumulator is
//! overwritten by any child, anything else is kept. The result depends on the
//! order children are folded in and is kept that way.

use super::{child_path, platform_path, PlatformsPanelItemsStore};
use crate::domain::panel::GroupKind;
use crate::domain::types::Status;
use tracing::debug;

const STATUS_PROBLEMS: &str = "Status problems found.";

pub fn fold_status(acc: Option<Status>, child: Option<Status>) -> Option<Status> {
    match acc {
        None => child,
        Some(Status::Unknown) if child == Some(Status::Bad) => Some(Status::Bad),
        Some(Status::Good) => child,
        other => other,
    }
}

/// Fold a sequence of child statuses starting from absent
pub fn rollup<I>(statuses: I) -> Option<Status>
where
    I: IntoIterator<Item = Option<Status>>,
{
    statuses.into_iter().fold(None, fold_status)
}

#[inline]
fn still_healthy(status: Option<Status>) -> bool {
    matches!(status, Some(Status::Good) | Some(Status::Unknown))
}

impl PlatformsPanelItemsStore {
    pub(super) fn status_at(&self, path: &[String]) -> Option<Status> {
        self.nodes.get(path).and_then(|node| node.status)
    }

    /// Fold the statuses of the children of the node at `path`
    pub(super) fn rollup_children(&self, path: &[String]) -> Option<Status> {
        rollup(self.get_children(path).into_iter().map(|node| node.status))
    }

    /// Recompute a platform from its agents, buildings and points groups
    pub(super) fn update_platform_status(&mut self, uuid: &str) {
        let path = platform_path(uuid);
        let Some(original) = self.nodes.get(path.as_slice()).map(|node| node.status) else {
            return;
        };

        // A missing group folds as absent and leaves the status unchanged
        let group_status = |kind: GroupKind| self.status_at(&child_path(&path, kind.key()));
        let mut status = fold_status(group_status(GroupKind::Agents), original);
        for kind in [GroupKind::Buildings, GroupKind::Points] {
            if still_healthy(status) {
                status = fold_status(group_status(kind), status);
            }
        }

        if status != original {
            if let Some(platform) = self.nodes.get_mut(path.as_slice()) {
                platform.status = status;
                platform.context = Some(STATUS_PROBLEMS.to_string());
            }
            debug!(platform = %uuid, status = ?status, "platform_status_changed");
        }
    }

    /// Refresh a device's sub-device group and the device itself
    pub(super) fn update_device_group_status(&mut self, parent: &[String]) {
        let group_path = child_path(parent, GroupKind::Devices.key());
        let Some(group_status) = self.nodes.get(group_path.as_slice()).map(|g| g.status) else {
            return;
        };

        // Each child is folded against the group's status as it was before
        // the refresh; the last child wins.
        let refreshed = self
            .get_children(&group_path)
            .iter()
            .map(|child| fold_status(child.status, group_status))
            .last()
            .unwrap_or(group_status);

        if let Some(group) = self.nodes.get_mut(group_path.as_slice()) {
            group.status = refreshed;
        }

        let parent_status = self.status_at(parent);
        let device_status = fold_status(refreshed, parent_status);
        if device_status != parent_status {
            if let Some(device) = self.nodes.get_mut(parent) {
                device.status = device_status;
                device.context = Some(STATUS_PROBLEMS.to_string());
            }
        }
    }
}
