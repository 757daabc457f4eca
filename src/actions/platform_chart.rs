//! Chart edits and historian queries

use super::historian_message;
use crate::actions::platform::platform_method;
use crate::app::Console;
use crate::domain::action::{Action, ChartItem};
use crate::domain::chart::{ChartType, TimedSample};
use crate::domain::types::ChartTopic;
use crate::infra::dispatcher::DispatchError;
use crate::io::exchange::RpcRequest;
use crate::io::rpc_error::RpcError;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Local platform topics are listed twice, once here and once per uuid
const LOCAL_PLATFORM_STATUS: &str = "datalogger/platform/status";
const PLATFORM_TOPIC: &str = "datalogger/platform";
const UNKNOWN_PLATFORM: &str = "Unknown Platform";

#[derive(Debug, Default, Deserialize)]
struct HistorianResult {
    #[serde(default)]
    values: Vec<TimedSample>,
}

/// Catalogue entry for a historian topic, or `None` for topics that cannot be charted.
///
/// `platform_name` resolves the uuid embedded in platform status topics.
fn chart_topic(
    topic: &str,
    platform_uuid: &str,
    platform_name: impl Fn(&str) -> Option<String>,
) -> Option<ChartTopic> {
    if topic.contains(LOCAL_PLATFORM_STATUS) {
        return None;
    }
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() <= 2 {
        return None;
    }
    if topic.contains(PLATFORM_TOPIC) {
        let (group, last) = (parts[parts.len() - 2], parts[parts.len() - 1]);
        let parent_path = platform_name(parts[2]).unwrap_or_else(|| UNKNOWN_PLATFORM.to_string());
        // The name is the last two segments, e.g. `times_percent / idle`
        Some(ChartTopic {
            path: topic.to_string(),
            name: format!("{group} / {last}"),
            label: format!("{group}/{last} ({parent_path})"),
            parent_path,
            parent_uuid: parts[2].to_string(),
        })
    } else {
        Some(ChartTopic::from_path(topic, platform_uuid))
    }
}

pub struct PlatformChartActions<'a> {
    console: &'a Console,
}

impl<'a> PlatformChartActions<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }

    fn is_pinned(&self, chart_key: &str) -> bool {
        self.console.charts().read().get_pinned(chart_key).unwrap_or(false)
    }

    /// Toggle the pin and store the new set of pinned charts
    pub async fn pin_chart(&self, chart_key: &str) -> Result<(), DispatchError> {
        self.console.dispatch(Action::PinChart { chart_key: chart_key.to_string() })?;
        self.console.platform().save_charts(None).await
    }

    pub async fn set_type(&self, chart_key: &str, chart_type: ChartType) -> Result<(), DispatchError> {
        self.console.dispatch(Action::ChangeChartType { chart_key: chart_key.to_string(), chart_type })?;
        self.save_if_pinned(chart_key).await
    }

    /// `None` stops periodic refresh
    pub async fn change_refresh_rate(&self, rate: Option<u64>, chart_key: &str) -> Result<(), DispatchError> {
        self.console.dispatch(Action::ChangeChartRefresh { chart_key: chart_key.to_string(), rate })?;
        self.save_if_pinned(chart_key).await
    }

    pub async fn change_data_length(&self, length: usize, chart_key: &str) -> Result<(), DispatchError> {
        self.console.dispatch(Action::ChangeChartLength { chart_key: chart_key.to_string(), length })?;
        self.save_if_pinned(chart_key).await
    }

    async fn save_if_pinned(&self, chart_key: &str) -> Result<(), DispatchError> {
        if self.is_pinned(chart_key) {
            self.console.platform().save_charts(None).await?;
        }
        Ok(())
    }

    /// Latest `count` samples of `item.topic`, stamped with the item's identity
    async fn query(&self, item: &ChartItem, count: usize) -> Result<Vec<TimedSample>, RpcError> {
        let request = RpcRequest::new(platform_method(&item.parent_uuid, "historian.query"))
            .with_params(json!({ "topic": item.topic, "count": count, "order": "LAST_TO_FIRST" }));
        let result: Option<HistorianResult> = self.console.request(request).await?;
        Ok(item.decorate(result.unwrap_or_default().values))
    }

    /// Requery every series of the chart, one call per series
    pub async fn refresh_chart(&self, chart_key: &str) -> Result<(), DispatchError> {
        let Some(chart) = self.console.charts().read().get_chart(chart_key) else {
            debug!(chart = %chart_key, "refresh_for_missing_chart");
            return Ok(());
        };

        for series in &chart.series {
            let item = ChartItem::from_series(chart_key, series);
            match self.query(&item, chart.data_length).await {
                Ok(data) => self.console.dispatch(Action::RefreshChart { item: item.with_data(data) })?,
                Err(e) => {
                    let message = historian_message(
                        self.console,
                        &e,
                        "Unable to update chart: ",
                        "The historian agent is unavailable.",
                        &item.parent_uuid,
                    );
                    self.console.report_failure(e, message)?;
                }
            }
        }
        debug!(chart = %chart_key, series = chart.series.len(), "chart_refreshed");
        Ok(())
    }

    /// Query the item's topic and add it as a series; `emit_change` defaults to true
    pub async fn add_to_chart(&self, item: ChartItem, emit_change: Option<bool>) -> Result<(), DispatchError> {
        let count = item
            .data_length
            .or_else(|| self.console.charts().read().get_data_length(&item.name))
            .unwrap_or_else(|| self.console.charts().read().defaults().data_length);

        let data = match self.query(&item, count).await {
            Ok(data) => data,
            Err(e) => {
                let message = historian_message(
                    self.console,
                    &e,
                    "Unable to load chart: ",
                    "The historian agent is not available.",
                    &item.parent_uuid,
                );
                if !item.path.is_empty() {
                    self.console.platforms_panel_actions().check_item(item.path.clone(), false)?;
                }
                return self.console.report_failure(e, message);
            }
        };

        let chart_key = item.name.clone();
        info!(chart = %chart_key, topic = %item.topic, samples = data.len(), "chart_item_loaded");
        self.console.dispatch(Action::ShowCharts { emit_change: emit_change.unwrap_or(true) })?;
        self.console.dispatch(Action::AddToChart { item: item.with_data(data) })?;

        let pinned = self.console.charts().read().get_pinned_charts();
        if pinned.iter().any(|c| c.chart_key == chart_key) {
            self.console.platform().save_charts(Some(pinned)).await?;
        }
        Ok(())
    }

    pub async fn remove_from_chart(&self, item: ChartItem) -> Result<(), DispatchError> {
        let was_saved = self.is_pinned(&item.name);
        self.console.dispatch(Action::RemoveFromChart { item })?;
        if was_saved {
            self.console.platform().save_charts(None).await?;
        }
        Ok(())
    }

    /// Delete the whole chart and uncheck its points in the panel
    pub async fn remove_chart(&self, chart_key: &str) -> Result<(), DispatchError> {
        let Some(chart) = self.console.charts().read().get_chart(chart_key) else {
            return Ok(());
        };

        self.console.dispatch(Action::RemoveChart { chart_key: chart_key.to_string() })?;
        let paths: Vec<Vec<String>> = {
            let items = self.console.panel_items().read();
            chart.series.iter().filter_map(|s| items.find_topic_in_tree(&s.topic)).collect()
        };
        let panel = self.console.platforms_panel_actions();
        for path in paths {
            panel.check_item(path, false)?;
        }

        if chart.pinned {
            self.console.platform().delete_chart(chart_key).await?;
        }
        info!(chart = %chart_key, "chart_removed");
        Ok(())
    }

    /// Fetch the historian's topic list as the chartable catalogue
    pub async fn load_chart_topics(&self, platform_uuid: &str) -> Result<(), DispatchError> {
        let topics: Vec<String> = match self.console.request(RpcRequest::new("historian.get_topic_list")).await {
            Ok(topics) => topics,
            Err(e) => {
                let message = if e.is_historian_unavailable() {
                    "Charts can't be added. The historian agent is unavailable.".to_string()
                } else {
                    e.message()
                };
                return self.console.report_failure(e, message);
            }
        };

        let topics: Vec<ChartTopic> = {
            let platforms = self.console.platforms().read();
            let platform_name = |uuid: &str| platforms.get_platform(uuid).map(|p| p.name.clone());
            topics.iter().filter_map(|t| chart_topic(t, platform_uuid, platform_name)).collect()
        };
        debug!(platform = %platform_uuid, topics = topics.len(), "chart_topics_loaded");
        self.console.dispatch(Action::ReceiveChartTopics { platform_uuid: platform_uuid.to_string(), topics })
    }
}
