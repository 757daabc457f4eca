//! Charts, their series and the historian topic catalogue
//!
//! Getters hand out owned copies so callers can never disturb the color
//! bookkeeping of a live chart.

use crate::domain::action::{Action, ChartItem};
use crate::domain::chart::{
    Chart, ChartSeries, ChartType, ColorAssignment, ColorName, ColorPool, TimedSample,
};
use crate::domain::types::ChartTopic;
use crate::infra::store::{Store, StoreHandle};
use crate::services::platforms_store::PlatformsStore;
use tracing::{debug, info};

const PLATFORM_TOPIC_PREFIX: &str = "datalogger/platforms/";

/// Defaults for charts created by `ADD_TO_CHART`
#[derive(Debug, Clone, Copy)]
pub struct ChartDefaults {
    pub refresh_interval_ms: u64,
    pub data_length: usize,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self { refresh_interval_ms: 15_000, data_length: 20 }
    }
}

pub struct PlatformChartStore {
    charts: Vec<Chart>,
    chart_topics: Vec<ChartTopic>,
    show_charts: bool,
    defaults: ChartDefaults,
    platforms: StoreHandle<PlatformsStore>,
}

/// Platform uuid of a `datalogger/platforms/<uuid>/...` topic
fn platform_of_topic(topic: &str) -> Option<&str> {
    topic.strip_prefix(PLATFORM_TOPIC_PREFIX)?.split('/').next()
}

fn build_series(item: &ChartItem, colors: ColorAssignment, data: &[TimedSample]) -> ChartSeries {
    ChartSeries {
        name: item.name.clone(),
        uuid: item.uuid.clone(),
        path: item.path.clone(),
        parent_uuid: item.parent_uuid.clone(),
        parent_type: item.parent_type,
        parent_path: item.parent_path.clone(),
        topic: item.topic.clone(),
        colors: Some(colors),
        data: data.iter().cloned().map(TimedSample::normalized).collect(),
    }
}

impl PlatformChartStore {
    pub fn new(platforms: StoreHandle<PlatformsStore>, defaults: ChartDefaults) -> Self {
        Self { charts: Vec::new(), chart_topics: Vec::new(), show_charts: false, defaults, platforms }
    }

    pub fn defaults(&self) -> ChartDefaults {
        self.defaults
    }

    fn chart_mut(&mut self, chart_key: &str) -> Option<&mut Chart> {
        self.charts.iter_mut().find(|c| c.chart_key == chart_key)
    }

    pub fn get_chart(&self, chart_key: &str) -> Option<Chart> {
        self.charts.iter().find(|c| c.chart_key == chart_key).cloned()
    }

    pub fn get_data(&self) -> Vec<Chart> {
        self.charts.clone()
    }

    /// Pinned charts that still have at least one series
    pub fn get_pinned_charts(&self) -> Vec<Chart> {
        self.charts.iter().filter(|c| c.pinned && !c.series.is_empty()).cloned().collect()
    }

    fn find(&self, chart_key: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.chart_key == chart_key)
    }

    pub fn get_pinned(&self, chart_key: &str) -> Option<bool> {
        self.find(chart_key).map(|c| c.pinned)
    }

    pub fn get_type(&self, chart_key: &str) -> ChartType {
        self.find(chart_key).map(|c| c.chart_type).unwrap_or_default()
    }

    pub fn get_refresh_rate(&self, chart_key: &str) -> Option<u64> {
        self.find(chart_key).and_then(|c| c.refresh_interval)
    }

    pub fn get_data_length(&self, chart_key: &str) -> Option<usize> {
        self.find(chart_key).map(|c| c.data_length)
    }

    pub fn get_topic_in_charts(&self, topic: &str, chart_key: &str) -> bool {
        self.find(chart_key).is_some_and(|c| c.series.iter().any(|s| s.topic == topic))
    }

    pub fn show_charts(&self) -> bool {
        self.show_charts
    }

    /// Topics that can still be charted
    pub fn get_chart_topics(&self) -> Vec<ChartTopic> {
        let platforms = self.platforms.read();
        self.chart_topics
            .iter()
            .filter(|topic| {
                !self.charts.iter().any(|c| c.series.iter().any(|s| s.topic == topic.path))
            })
            .filter(|topic| match platform_of_topic(&topic.path) {
                Some(uuid) => platforms.is_registered(uuid),
                None => true,
            })
            .cloned()
            .collect()
    }

    fn add_to_chart(&mut self, item: &ChartItem) -> bool {
        let Some(data) = item.data.as_deref() else {
            debug!(chart = %item.name, uuid = %item.uuid, "chart_add_without_data");
            return false;
        };

        if let Some(chart) = self.chart_mut(&item.name) {
            if chart.series_index(&item.uuid).is_some() {
                return false;
            }
            let colors = chart.acquire_color();
            chart.series.push(build_series(item, colors, data));
            debug!(chart = %item.name, uuid = %item.uuid, series = chart.series.len(), "chart_series_added");
            return true;
        }

        let mut pool = ColorPool::full();
        let colors = pool.acquire().unwrap_or_else(|| ColorAssignment::of(ColorName::Blue));
        let chart = Chart {
            chart_key: item.name.clone(),
            refresh_interval: Some(item.refresh_interval.unwrap_or(self.defaults.refresh_interval_ms)),
            data_length: item.data_length.unwrap_or(self.defaults.data_length),
            pinned: item.pinned.unwrap_or(false),
            chart_type: item.chart_type.unwrap_or_default(),
            available_colors: Some(pool),
            series: vec![build_series(item, colors, data)],
        };
        info!(chart = %item.name, uuid = %item.uuid, "chart_created");
        self.charts.push(chart);
        true
    }

    fn remove_from_chart(&mut self, item: &ChartItem) -> bool {
        let Some(position) = self.charts.iter().position(|c| c.chart_key == item.name) else {
            return false;
        };
        let chart = &mut self.charts[position];
        let Some(index) = chart.series_index(&item.uuid) else {
            return false;
        };
        let removed = chart.series.remove(index);
        if chart.series.is_empty() {
            self.charts.remove(position);
            info!(chart = %item.name, "chart_removed_last_series");
        } else if let Some(colors) = removed.colors {
            chart.release_color(colors);
        }
        true
    }

    fn refresh_chart(&mut self, item: &ChartItem) -> bool {
        let Some(data) = item.data.as_deref() else {
            return false;
        };
        let Some(chart) = self.chart_mut(&item.name) else {
            debug!(chart = %item.name, "chart_refresh_for_missing_chart");
            return false;
        };
        let Some(index) = chart.series_index(&item.uuid) else {
            debug!(chart = %item.name, uuid = %item.uuid, "chart_refresh_for_missing_series");
            return false;
        };
        let colors = match chart.series[index].colors.clone() {
            Some(colors) => colors,
            None => chart.acquire_color(),
        };
        chart.series[index] = build_series(item, colors, data);
        true
    }

    fn update_chart(&mut self, chart_key: &str, update: impl FnOnce(&mut Chart)) -> bool {
        match self.chart_mut(chart_key) {
            Some(chart) => {
                update(chart);
                true
            }
            None => false,
        }
    }

    fn load_charts(&mut self, charts: &[Chart]) {
        self.charts = charts.to_vec();
        for chart in &mut self.charts {
            chart.assign_legacy_colors();
        }
        info!(count = self.charts.len(), "charts_loaded");
    }
}

impl Store for PlatformChartStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::ShowCharts { emit_change } => {
                self.show_charts = true;
                *emit_change
            }
            Action::AddToChart { item } => self.add_to_chart(item),
            Action::RemoveFromChart { item } => self.remove_from_chart(item),
            Action::RefreshChart { item } => self.refresh_chart(item),
            Action::PinChart { chart_key } => self.update_chart(chart_key, |c| c.pinned = !c.pinned),
            Action::ChangeChartType { chart_key, chart_type } => {
                let chart_type = *chart_type;
                self.update_chart(chart_key, |c| c.chart_type = chart_type)
            }
            Action::ChangeChartRefresh { chart_key, rate } => {
                let rate = *rate;
                self.update_chart(chart_key, |c| c.refresh_interval = rate)
            }
            Action::ChangeChartLength { chart_key, length } => {
                let length = *length;
                self.update_chart(chart_key, |c| c.data_length = length)
            }
            Action::RemoveChart { chart_key } => {
                let before = self.charts.len();
                self.charts.retain(|c| &c.chart_key != chart_key);
                before != self.charts.len()
            }
            Action::LoadCharts { charts } => {
                self.load_charts(charts);
                true
            }
            Action::ReceiveChartTopics { platform_uuid, topics } => {
                self.chart_topics = topics.clone();
                debug!(platform = %platform_uuid, count = topics.len(), "chart_topics_received");
                true
            }
            Action::ClearAuthorization => {
                self.charts.clear();
                self.chart_topics.clear();
                self.show_charts = false;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{NodeType, Platform};
    use std::collections::HashSet;

    fn store() -> PlatformChartStore {
        PlatformChartStore::new(StoreHandle::new(PlatformsStore::new()), ChartDefaults::default())
    }

    fn item(name: &str, uuid: &str, values: &[f64]) -> ChartItem {
        ChartItem {
            name: name.into(),
            uuid: uuid.into(),
            path: vec!["platforms".into(), "p1".into(), "points".into(), uuid.into()],
            parent_uuid: "p1".into(),
            parent_type: Some(NodeType::Device),
            parent_path: "campus > b1 > d1".into(),
            topic: format!("campus/b1/{uuid}/{name}"),
            data: Some(values.iter().enumerate().map(|(i, v)| TimedSample::at(i as i64, *v)).collect()),
            ..Default::default()
        }
    }

    fn assert_unique_colors(chart: &Chart) {
        let mut seen = HashSet::new();
        let held = chart.series.iter().filter_map(|s| s.colors.as_ref().map(|c| c.name));
        let pooled = chart.available_colors.iter().flat_map(|p| p.names());
        for name in held.chain(pooled) {
            assert!(seen.insert(name), "{name:?} appears twice in {}", chart.chart_key);
        }
    }

    #[test]
    fn test_add_creates_chart_with_defaults() {
        let mut store = store();
        assert!(store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) }));

        let chart = store.get_chart("temp").unwrap();
        assert_eq!(chart.refresh_interval, Some(15_000));
        assert_eq!(chart.data_length, 20);
        assert!(!chart.pinned);
        assert_eq!(chart.chart_type, ChartType::Line);
        assert_eq!(chart.series[0].colors.as_ref().unwrap().name, ColorName::Blue);
        assert_eq!(chart.available_colors.as_ref().unwrap().len(), 13);
    }

    #[test]
    fn test_add_same_uuid_twice_keeps_one_series() {
        let mut store = store();
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) });
        assert!(!store.reduce(&Action::AddToChart { item: item("temp", "d1", &[2.0]) }));
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[3.0]) });

        let chart = store.get_chart("temp").unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].data[0].value, 1.0);
    }

    #[test]
    fn test_add_without_data_is_ignored() {
        let mut store = store();
        let mut no_data = item("temp", "d1", &[]);
        no_data.data = None;
        assert!(!store.reduce(&Action::AddToChart { item: no_data }));
        assert!(store.get_data().is_empty());
    }

    #[test]
    fn test_colors_stay_unique_through_add_remove_cycles() {
        let mut store = store();
        for i in 0..6 {
            store.reduce(&Action::AddToChart { item: item("temp", &format!("d{i}"), &[1.0]) });
        }
        store.reduce(&Action::RemoveFromChart { item: item("temp", "d2", &[]) });
        store.reduce(&Action::RemoveFromChart { item: item("temp", "d4", &[]) });
        store.reduce(&Action::AddToChart { item: item("temp", "d9", &[1.0]) });

        let chart = store.get_chart("temp").unwrap();
        assert_eq!(chart.series.len(), 5);
        assert_unique_colors(&chart);
    }

    #[test]
    fn test_removing_last_series_deletes_chart() {
        let mut store = store();
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) });
        assert!(store.reduce(&Action::RemoveFromChart { item: item("temp", "d1", &[]) }));
        assert!(store.get_chart("temp").is_none());
        assert!(!store.reduce(&Action::RemoveFromChart { item: item("temp", "d1", &[]) }));
    }

    #[test]
    fn test_refresh_replaces_data_in_place_and_keeps_color() {
        let mut store = store();
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) });
        store.reduce(&Action::AddToChart { item: item("temp", "d2", &[1.0]) });
        store.reduce(&Action::PinChart { chart_key: "temp".into() });
        let before = store.get_chart("temp").unwrap();

        assert!(store.reduce(&Action::RefreshChart { item: item("temp", "d1", &[7.0, 8.0]) }));
        let after = store.get_chart("temp").unwrap();
        assert_eq!(after.series[0].uuid, "d1");
        assert_eq!(after.series[0].data.len(), 2);
        assert_eq!(after.series[0].data[1].value, 8.0);
        assert_eq!(after.series[0].colors, before.series[0].colors);
        assert!(after.pinned);

        // Refresh for a chart that went away is dropped
        assert!(!store.reduce(&Action::RefreshChart { item: item("gone", "d1", &[1.0]) }));
    }

    #[test]
    fn test_settings_and_pinned_charts() {
        let mut store = store();
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) });
        store.reduce(&Action::AddToChart { item: item("humidity", "d1", &[1.0]) });

        store.reduce(&Action::PinChart { chart_key: "temp".into() });
        store.reduce(&Action::ChangeChartType { chart_key: "temp".into(), chart_type: ChartType::StackedArea });
        store.reduce(&Action::ChangeChartRefresh { chart_key: "temp".into(), rate: Some(5_000) });
        store.reduce(&Action::ChangeChartLength { chart_key: "temp".into(), length: 40 });
        assert!(!store.reduce(&Action::PinChart { chart_key: "nope".into() }));

        assert_eq!(store.get_pinned("temp"), Some(true));
        assert_eq!(store.get_type("temp"), ChartType::StackedArea);
        assert_eq!(store.get_type("nope"), ChartType::Line);
        assert_eq!(store.get_refresh_rate("temp"), Some(5_000));
        assert_eq!(store.get_data_length("temp"), Some(40));

        let pinned = store.get_pinned_charts();
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].chart_key, "temp");
    }

    #[test]
    fn test_load_charts_round_trip_adds_only_colors() {
        let input: Vec<Chart> = serde_json::from_value(serde_json::json!([{
            "chartKey": "temp",
            "refreshInterval": 15000,
            "dataLength": 20,
            "pinned": true,
            "type": "line",
            "series": [
                {"name": "temp", "uuid": "d1", "parentUuid": "p1", "parentPath": "a > b",
                 "topic": "campus/b1/d1/temp", "data": [{"0": 1, "1": 2.0}]},
                {"name": "temp", "uuid": "d2", "parentUuid": "p1", "parentPath": "a > c",
                 "topic": "campus/b1/d2/temp", "data": []}
            ]
        }]))
        .unwrap();

        let mut store = store();
        store.reduce(&Action::LoadCharts { charts: input.clone() });
        let output = store.get_data();

        assert_eq!(output.len(), 1);
        let mut stripped = output[0].clone();
        for series in &mut stripped.series {
            assert!(series.colors.is_some());
            series.colors = None;
        }
        assert_eq!(stripped, input[0]);
        assert_unique_colors(&output[0]);
    }

    #[test]
    fn test_topic_in_charts_and_catalogue_filtering() {
        let platforms = StoreHandle::new(PlatformsStore::new());
        platforms.apply(&Action::ReceivePlatforms { platforms: vec![Platform::new("p1", "vc")] });

        let mut store = PlatformChartStore::new(platforms, ChartDefaults::default());
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) });
        assert!(store.get_topic_in_charts("campus/b1/d1/temp", "temp"));
        assert!(!store.get_topic_in_charts("campus/b1/d1/temp", "other"));

        store.reduce(&Action::ReceiveChartTopics {
            platform_uuid: "p1".into(),
            topics: vec![
                ChartTopic::from_path("campus/b1/d1/temp", "p1"),
                ChartTopic::from_path("campus/b1/d1/humidity", "p1"),
                ChartTopic::from_path("datalogger/platforms/p1/status/cpu", "p1"),
                ChartTopic::from_path("datalogger/platforms/gone/status/cpu", "p1"),
            ],
        });

        let paths: Vec<_> = store.get_chart_topics().into_iter().map(|t| t.path).collect();
        assert_eq!(paths, vec!["campus/b1/d1/humidity", "datalogger/platforms/p1/status/cpu"]);
    }

    #[test]
    fn test_show_charts_and_logout() {
        let mut store = store();
        assert!(!store.reduce(&Action::ShowCharts { emit_change: false }));
        assert!(store.show_charts());
        store.reduce(&Action::AddToChart { item: item("temp", "d1", &[1.0]) });

        store.reduce(&Action::ClearAuthorization);
        assert!(store.get_data().is_empty());
        assert!(!store.show_charts());
    }

    #[test]
    fn test_sample_times_normalized_on_insert() {
        let mut store = store();
        let mut with_text = item("temp", "d1", &[]);
        with_text.data = Some(vec![TimedSample::new(
            crate::domain::chart::SampleTime::Text("2016-03-01T12:00:00+00:00".into()),
            1.0,
        )]);
        store.reduce(&Action::AddToChart { item: with_text });
        let chart = store.get_chart("temp").unwrap();
        assert_eq!(chart.series[0].data[0].time.as_millis(), Some(1_456_833_600_000));
    }
}
