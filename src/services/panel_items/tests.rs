//! Tests for the platforms-panel item tree

use super::*;
use crate::domain::action::ChartItem;
use crate::domain::chart::TimedSample;
use crate::domain::panel::NodeKind;
use crate::domain::types::{
    Agent, DeviceRecord, Health, NodeType, PerformancePoint, Platform, Status,
};
use crate::services::platform_chart_store::{ChartDefaults, PlatformChartStore};
use crate::services::platforms_store::PlatformsStore;

fn path(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn chart_handle() -> StoreHandle<PlatformChartStore> {
    StoreHandle::new(PlatformChartStore::new(
        StoreHandle::new(PlatformsStore::new()),
        ChartDefaults::default(),
    ))
}

fn store_with_platform() -> PlatformsPanelItemsStore {
    let mut store = PlatformsPanelItemsStore::new(chart_handle());
    store.reduce(&Action::ReceivePlatformStatuses {
        platforms: vec![Platform::new("p1", "vc").with_health(Health::new(Status::Good))],
    });
    store
}

fn good(path: &str) -> DeviceRecord {
    DeviceRecord::new(path, Health::new(Status::Good))
}

fn agent(uuid: &str, status: Status) -> Agent {
    let mut agent = Agent::new(uuid, format!("{uuid}-agent"));
    agent.health = Some(Health::new(status).with_context("agent context"));
    agent
}

/// Every node reachable through `get_children` is addressable by its path
fn assert_tree_consistent(store: &PlatformsPanelItemsStore) {
    let mut stack: Vec<Vec<String>> = store.get_platforms().iter().map(|p| p.path.clone()).collect();
    let mut reached = 0;
    while let Some(current) = stack.pop() {
        let node = store.get_item(&current).expect("reachable node must exist");
        assert_eq!(node.path, current);
        reached += 1;
        assert_eq!(store.get_children(&current).len(), node.children.len());
        for child in store.get_children(&current) {
            assert_eq!(child.path, child_path(&current, child.path.last().unwrap()));
            assert_eq!(store.get_item(&child.path), Some(child));
            stack.push(child.path.clone());
        }
    }
    assert_eq!(reached, store.len(), "arena holds unreachable nodes");
}

#[test]
fn test_fold_status_rules() {
    use Status::*;
    assert_eq!(rollup([Some(Good), Some(Bad)]), Some(Bad));
    // A BAD accumulator is kept
    assert_eq!(rollup([Some(Bad), Some(Good)]), Some(Bad));
    assert_eq!(rollup([Some(Unknown), Some(Bad)]), Some(Bad));
    assert_eq!(rollup([Some(Unknown), Some(Good)]), Some(Unknown));
    assert_eq!(rollup([Some(Good), Some(Unknown)]), Some(Unknown));
    // Order dependence: a GOOD accumulator takes whatever comes next
    assert_eq!(rollup([Some(Good), None]), None);
    assert_eq!(rollup([None, Some(Good)]), Some(Good));
    assert_eq!(rollup(Vec::<Option<Status>>::new()), None);
    assert_eq!(fold_status(None, Some(Bad)), Some(Bad));
}

#[test]
fn test_platform_statuses_replace_and_remove() {
    let mut store = store_with_platform();
    let platform = store.get_item(&platform_path("p1")).unwrap();
    assert_eq!(platform.status, Some(Status::Good));
    assert_eq!(platform.status_label(), Some("Healthy"));
    assert_eq!(platform.expanded, None);
    assert_eq!(platform.node_type(), NodeType::Platform);

    store.reduce(&Action::ReceiveAgentStatuses {
        platform_uuid: "p1".into(),
        agents: vec![agent("a1", Status::Good)],
    });
    store.reduce(&Action::ReceivePlatformStatuses {
        platforms: vec![Platform::new("p2", "lab"), Platform::new("p1", "vc")],
    });

    // Replaced platforms start over without children
    let names: Vec<_> = store.get_platforms().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["lab", "vc"]);
    assert!(store.get_item(&path(&["platforms", "p1", "agents"])).is_none());
    assert_eq!(store.get_item(&platform_path("p2")).unwrap().status, Some(Status::Unknown));

    store.reduce(&Action::ReceivePlatformStatuses { platforms: vec![Platform::new("p2", "lab")] });
    assert!(store.get_item(&platform_path("p1")).is_none());
    assert_tree_consistent(&store);
}

#[test]
fn test_insert_agents_group() {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceiveAgentStatuses {
        platform_uuid: "p1".into(),
        agents: vec![agent("a1", Status::Good), agent("a2", Status::Bad)],
    });

    let group = store.get_item(&path(&["platforms", "p1", "agents"])).unwrap();
    assert_eq!(group.name, "Agents");
    assert_eq!(group.sort_order, 3);
    assert_eq!(group.node_type(), NodeType::Type);
    assert_eq!(group.status, Some(Status::Bad));
    assert_eq!(group.children, vec!["a1", "a2"]);

    let a1 = store.get_item(&path(&["platforms", "p1", "agents", "a1"])).unwrap();
    assert_eq!(a1.context.as_deref(), Some("agent context"));

    // A second update replaces the group
    store.reduce(&Action::ReceiveAgentStatuses {
        platform_uuid: "p1".into(),
        agents: vec![agent("a3", Status::Good)],
    });
    let group = store.get_item(&path(&["platforms", "p1", "agents"])).unwrap();
    assert_eq!(group.children, vec!["a3"]);
    assert!(store.get_item(&path(&["platforms", "p1", "agents", "a1"])).is_none());
    assert_tree_consistent(&store);
}

#[test]
fn test_insert_devices_builds_buildings_and_points() {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![
            good("campus/b1/d1").with_points(&["temp", "Fan Speed"]),
            DeviceRecord::new("campus/b1/d2", Health::new(Status::Bad).with_context("offline")),
        ],
    });

    let buildings = store.get_item(&path(&["platforms", "p1", "buildings"])).unwrap();
    assert_eq!(buildings.sort_order, 2);
    assert_eq!(buildings.status, Some(Status::Bad));

    let building = store.get_item(&path(&["platforms", "p1", "buildings", "campus_b1"])).unwrap();
    assert_eq!(building.name, "b1");
    assert_eq!(building.legend_info(), Some("campus > b1"));
    assert_eq!(building.status, Some(Status::Bad));

    let d1_path = path(&["platforms", "p1", "buildings", "campus_b1", "devices", "campus_b1_d1"]);
    let d1 = store.get_item(&d1_path).unwrap();
    assert_eq!(d1.name, "d1");
    assert_eq!(d1.legend_info(), Some("campus > b1 > d1"));
    assert_eq!(d1.children, vec!["points"]);

    let points = store.get_children(&child_path(&d1_path, "points"));
    assert_eq!(points.len(), 2);
    let fan = points[1];
    assert_eq!(fan.uuid, "campus_b1_d1_Fan_Speed");
    let info = fan.point().unwrap();
    assert_eq!(info.topic, "campus/b1/d1/Fan Speed");
    assert_eq!(info.parent_path, "campus > b1 > d1");
    assert_eq!(info.parent_type, NodeType::Device);
    assert_eq!(info.parent_uuid, "p1");
    assert!(!info.checked);
    assert_eq!(fan.status, Some(Status::Good));

    let temp = child_path(&child_path(&d1_path, "points"), "campus_b1_d1_temp");
    assert_eq!(store.find_topic_in_tree("campus/b1/d1/temp"), Some(temp));
    assert_eq!(store.find_topic_in_tree("campus/b1/d9/temp"), None);
    assert_tree_consistent(&store);
}

#[test]
fn test_resent_device_drops_stale_points() {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![good("campus/b1/d1").with_points(&["temp", "humidity"]), good("campus/b1/d2").with_points(&["flow"])],
    });
    let before = store.len();

    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![good("campus/b1/d1").with_points(&["temp"])],
    });

    assert_eq!(store.len(), before - 1);
    assert!(store.find_topic_in_tree("campus/b1/d1/temp").is_some());
    assert_eq!(store.find_topic_in_tree("campus/b1/d1/humidity"), None);
    // Sibling devices are untouched
    assert!(store.find_topic_in_tree("campus/b1/d2/flow").is_some());
    assert_tree_consistent(&store);
}

#[test]
fn test_large_device_point_list_inserts_in_linear_time() {
    let names: Vec<String> = (0..20_000).map(|i| format!("point{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut store = store_with_platform();

    let started = std::time::Instant::now();
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![good("campus/b1/d1").with_points(&refs)],
    });
    let elapsed = started.elapsed();

    let points = path(&["platforms", "p1", "buildings", "campus_b1", "devices", "campus_b1_d1", "points"]);
    assert_eq!(store.get_children(&points).len(), 20_000);
    assert!(elapsed < std::time::Duration::from_secs(2), "inserting 20000 points took {elapsed:?}");
    assert_tree_consistent(&store);
}

#[test]
fn test_sub_devices_nest_identically_in_either_order() {
    let forward = {
        let mut store = store_with_platform();
        store.reduce(&Action::ReceiveDeviceStatuses {
            platform_uuid: "p1".into(),
            devices: vec![good("campus/b1/d1"), good("campus/b1/d1/sub1")],
        });
        store
    };
    let reverse = {
        let mut store = store_with_platform();
        store.reduce(&Action::ReceiveDeviceStatuses {
            platform_uuid: "p1".into(),
            devices: vec![good("campus/b1/d1/sub1"), good("campus/b1/d1")],
        });
        store
    };

    let sub_path = path(&[
        "platforms", "p1", "buildings", "campus_b1", "devices", "campus_b1_d1", "devices", "campus_b1_d1_sub1",
    ]);
    for store in [&forward, &reverse] {
        let sub = store.get_item(&sub_path).unwrap();
        assert_eq!(sub.name, "sub1");
        assert_eq!(sub.legend_info(), Some("campus > b1 > d1 > sub1"));
        assert_tree_consistent(store);
    }
    assert_eq!(forward.get_item(&sub_path), reverse.get_item(&sub_path));
    assert_eq!(forward.len(), reverse.len());
}

#[test]
fn test_short_and_orphan_device_paths_are_skipped() {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![good("campus/b1"), good("campus/b2/d9/sub1")],
    });

    assert!(store.get_item(&path(&["platforms", "p1", "buildings", "campus_b1"])).is_none());
    let building = path(&["platforms", "p1", "buildings", "campus_b2"]);
    assert!(store.get_children(&child_path(&building, "devices")).is_empty());
    assert_tree_consistent(&store);
}

#[test]
fn test_sub_device_group_status_refreshes_on_second_child() {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![
            good("campus/b1/d1"),
            good("campus/b1/d1/sub1"),
            DeviceRecord::new("campus/b1/d1/sub2", Health::new(Status::Bad)),
        ],
    });

    let d1 = path(&["platforms", "p1", "buildings", "campus_b1", "devices", "campus_b1_d1"]);
    let group = store.get_item(&child_path(&d1, "devices")).unwrap();
    assert_eq!(group.status, Some(Status::Bad));
    let device = store.get_item(&d1).unwrap();
    assert_eq!(device.status, Some(Status::Bad));
    assert_eq!(device.context.as_deref(), Some("Status problems found."));
}

#[test]
fn test_end_loading_rolls_status_up_and_expands() {
    let mut store = store_with_platform();
    store.reduce(&Action::StartLoadingData { uuid: "p1".into() });
    assert_eq!(store.get_loading_complete("p1"), Some(false));

    store.reduce(&Action::ReceiveAgentStatuses {
        platform_uuid: "p1".into(),
        agents: vec![agent("a1", Status::Good)],
    });
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![DeviceRecord::new("campus/b1/d1", Health::new(Status::Bad))],
    });
    store.reduce(&Action::EndLoadingData { uuid: "p1".into() });

    let platform = store.get_item(&platform_path("p1")).unwrap();
    assert_eq!(store.get_loading_complete("p1"), Some(true));
    assert_eq!(platform.status, Some(Status::Bad));
    assert_eq!(platform.status_label(), Some("Unhealthy"));
    assert_eq!(platform.context.as_deref(), Some("Status problems found."));
    assert_eq!(platform.expanded, Some(true));
}

#[test]
fn test_end_loading_without_children_stays_collapsed() {
    let mut store = store_with_platform();
    store.reduce(&Action::StartLoadingData { uuid: "p1".into() });
    store.reduce(&Action::CancelLoadingData { uuid: "p1".into() });
    assert_eq!(store.get_loading_complete("p1"), Some(true));

    store.reduce(&Action::EndLoadingData { uuid: "p1".into() });
    let platform = store.get_item(&platform_path("p1")).unwrap();
    assert_eq!(platform.expanded, None);
    assert_eq!(platform.status, Some(Status::Good));
    assert_eq!(platform.context, None);
}

#[test]
fn test_performance_points_attach_to_platform() {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceivePerformanceStats {
        parent_uuid: "p1".into(),
        parent_type: NodeType::Platform,
        points: vec![PerformancePoint {
            topic: "datalogger/platforms/p1/status/cpu/percent".into(),
            name: "cpu / percent".into(),
        }],
    });

    let platform = store.get_item(&platform_path("p1")).unwrap();
    assert_eq!(platform.expanded, Some(true));
    let group = store.get_item(&path(&["platforms", "p1", "points"])).unwrap();
    assert_eq!(group.name, "Performance");
    assert_eq!(group.sort_order, 0);
    assert_eq!(group.status, Some(Status::Good));

    let children = store.get_children(&group.path);
    let point = children[0];
    let info = point.point().unwrap();
    assert_eq!(info.parent_path, "vc");
    assert_eq!(info.parent_type, NodeType::Platform);
    assert_eq!(point.uuid, "datalogger_platforms_p1_status_cpu_percent");

    // Only platforms carry performance points
    assert!(!store.reduce(&Action::ReceivePerformanceStats {
        parent_uuid: "p1".into(),
        parent_type: NodeType::Device,
        points: vec![],
    }));
}

#[test]
fn test_points_reflect_charted_topics() {
    let charts = chart_handle();
    charts.apply(&Action::AddToChart {
        item: ChartItem {
            name: "temp".into(),
            uuid: "campus_b1_d1_temp".into(),
            topic: "campus/b1/d1/temp".into(),
            data: Some(vec![TimedSample::at(0, 1.0)]),
            ..Default::default()
        },
    });
    let mut store = PlatformsPanelItemsStore::new(charts);
    store.reduce(&Action::ReceivePlatformStatuses { platforms: vec![Platform::new("p1", "vc")] });
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![good("campus/b1/d1").with_points(&["temp", "humidity"])],
    });

    let temp = store.find_topic_in_tree("campus/b1/d1/temp").unwrap();
    assert!(store.get_item(&temp).unwrap().point().unwrap().checked);
    let humidity = store.find_topic_in_tree("campus/b1/d1/humidity").unwrap();
    assert!(!store.get_item(&humidity).unwrap().point().unwrap().checked);

    store.reduce(&Action::CheckItem { path: humidity.clone(), checked: true });
    assert!(store.get_item(&humidity).unwrap().point().unwrap().checked);
    assert!(store.get_last_check());

    // Only points can be checked
    assert!(!store.reduce(&Action::CheckItem { path: platform_path("p1"), checked: true }));
}

fn loaded_store() -> PlatformsPanelItemsStore {
    let mut store = store_with_platform();
    store.reduce(&Action::ReceiveAgentStatuses {
        platform_uuid: "p1".into(),
        agents: vec![agent("listener", Status::Good)],
    });
    store.reduce(&Action::ReceiveDeviceStatuses {
        platform_uuid: "p1".into(),
        devices: vec![
            good("campus/b1/rtu1").with_points(&["temp"]),
            DeviceRecord::new("campus/b1/rtu2", Health::new(Status::Bad)).with_points(&["pressure"]),
        ],
    });
    store.reduce(&Action::EndLoadingData { uuid: "p1".into() });
    store
}

#[test]
fn test_filter_by_term_shows_matching_branch() {
    let mut store = loaded_store();
    store.reduce(&Action::FilterItems { term: "PRESS".into(), status: String::new() });

    let pressure = store.find_topic_in_tree("campus/b1/rtu2/pressure").unwrap();
    let temp = store.find_topic_in_tree("campus/b1/rtu1/temp").unwrap();
    let point = store.get_item(&pressure).unwrap();
    assert!(point.visible);
    assert_eq!(point.expanded, None);
    assert!(!store.get_item(&temp).unwrap().visible);

    let rtu1 = path(&["platforms", "p1", "buildings", "campus_b1", "devices", "campus_b1_rtu1"]);
    let rtu1_node = store.get_item(&rtu1).unwrap();
    assert!(!rtu1_node.visible);
    assert_eq!(rtu1_node.expanded, Some(false));

    let platform = store.get_item(&platform_path("p1")).unwrap();
    assert!(platform.visible);
    assert_eq!(platform.expanded, Some(true));
    assert!(!store.get_item(&path(&["platforms", "p1", "agents"])).unwrap().visible);
}

#[test]
fn test_filter_by_field_and_status() {
    let mut store = loaded_store();
    store.reduce(&Action::FilterItems { term: "topic:rtu1/te".into(), status: String::new() });
    let temp = store.find_topic_in_tree("campus/b1/rtu1/temp").unwrap();
    assert!(store.get_item(&temp).unwrap().visible);
    // Nodes without the field never match
    assert!(!store.get_item(&path(&["platforms", "p1", "agents", "listener"])).unwrap().visible);

    store.reduce(&Action::FilterItems { term: String::new(), status: "BAD".into() });
    let pressure = store.find_topic_in_tree("campus/b1/rtu2/pressure").unwrap();
    assert!(store.get_item(&pressure).unwrap().visible);
    assert!(!store.get_item(&temp).unwrap().visible);

    // A term wins over a status
    store.reduce(&Action::FilterItems { term: "temp".into(), status: "BAD".into() });
    assert!(store.get_item(&temp).unwrap().visible);
    assert!(!store.get_item(&pressure).unwrap().visible);
}

#[test]
fn test_status_filter_matches_missing_status_as_unknown() {
    let filter = ItemFilter::parse("", "UNKNOWN");
    let node = PanelNode::new(NodeKind::Platform, "p", "p", platform_path("p"));
    assert!(filter.matches(&node));
    assert!(!ItemFilter::parse("", "GOOD").matches(&node));
    assert_eq!(ItemFilter::parse("", ""), ItemFilter::Reset);
    assert_eq!(
        ItemFilter::parse("name:rtu 1", "BAD"),
        ItemFilter::Term { field: Some("name".into()), needle: "rtu 1".into() }
    );
}

#[test]
fn test_empty_filter_resets_visibility() {
    let mut store = loaded_store();
    store.reduce(&Action::FilterItems { term: "pressure".into(), status: String::new() });
    store.reduce(&Action::FilterItems { term: String::new(), status: String::new() });

    for node in store.nodes.values() {
        assert!(node.visible, "{:?} hidden after reset", node.path);
        if node.children.is_empty() {
            assert_eq!(node.expanded, None);
        } else {
            assert_eq!(node.expanded, Some(false));
        }
    }
}

#[test]
fn test_expand_all_and_toggle() {
    let mut store = loaded_store();
    let buildings = path(&["platforms", "p1", "buildings"]);
    let building = child_path(&buildings, "campus_b1");
    let rtu1 = path(&["platforms", "p1", "buildings", "campus_b1", "devices", "campus_b1_rtu1"]);

    store.reduce(&Action::ExpandAll { path: buildings.clone() });
    assert_eq!(store.get_item(&buildings).unwrap().expanded, Some(true));
    assert_eq!(store.get_item(&rtu1).unwrap().expanded, Some(true));

    store.reduce(&Action::ToggleItem { path: building.clone() });
    assert_eq!(store.get_item(&building).unwrap().expanded, Some(false));

    store.reduce(&Action::ExpandAll { path: buildings.clone() });
    assert_eq!(store.get_item(&buildings).unwrap().expanded, Some(false));
    assert_eq!(store.get_item(&rtu1).unwrap().expanded, Some(false));
    assert!(!store.reduce(&Action::ToggleItem { path: path(&["platforms", "nope"]) }));
}

#[test]
fn test_sorted_children_follow_group_order() {
    let mut store = loaded_store();
    store.reduce(&Action::ReceivePerformanceStats {
        parent_uuid: "p1".into(),
        parent_type: NodeType::Platform,
        points: vec![PerformancePoint { topic: "datalogger/platforms/p1/cpu".into(), name: "cpu".into() }],
    });
    let keys: Vec<_> = store
        .get_children_sorted(&platform_path("p1"))
        .iter()
        .map(|n| n.uuid.as_str())
        .collect();
    assert_eq!(keys, vec!["points", "buildings", "agents"]);
}

#[test]
fn test_clear_authorization_empties_tree() {
    let mut store = loaded_store();
    store.reduce(&Action::ClearAuthorization);
    assert!(store.is_empty());
    assert!(store.get_platforms().is_empty());
    assert_eq!(store.get_loading_complete("p1"), None);
}
