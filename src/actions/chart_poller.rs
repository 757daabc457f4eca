//! Periodic chart refresh
//!
//! One task per polled chart. Each cycle refreshes every series, then sleeps
//! for the chart's current refresh interval, never less than
//! `MIN_REFRESH_INTERVAL`. A chart whose interval is `None` is not queried;
//! the task waits for the chart store to change and checks again. Stopping
//! cancels the wait only; a refresh already under way completes and still
//! dispatches.

use crate::app::Console;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct ChartPoller {
    chart_key: String,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ChartPoller {
    /// Start polling `chart_key`; the task ends on its own once the chart is removed
    pub fn spawn(console: Arc<Console>, chart_key: impl Into<String>) -> Self {
        let chart_key = chart_key.into();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(console, chart_key.clone(), shutdown_rx));
        Self { chart_key, shutdown, handle }
    }

    pub fn chart_key(&self) -> &str {
        &self.chart_key
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the pending sleep and wait for the task to end
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(chart = %self.chart_key, error = %e, "chart_poller_join_failed");
        }
    }
}

/// Shortest sleep between two refreshes of the same chart
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    /// The chart was removed
    Gone,
    /// Periodic refresh is off
    Paused,
    Every(Duration),
}

fn schedule(console: &Console, chart_key: &str) -> Schedule {
    let charts = console.charts().read();
    match charts.get_chart(chart_key) {
        None => Schedule::Gone,
        Some(chart) => match chart.refresh_interval {
            None => Schedule::Paused,
            Some(ms) => Schedule::Every(Duration::from_millis(ms).max(MIN_REFRESH_INTERVAL)),
        },
    }
}

async fn run(console: Arc<Console>, chart_key: String, mut shutdown: watch::Receiver<bool>) {
    info!(chart = %chart_key, "chart_poller_started");
    let mut changes = console.charts().subscribe();

    loop {
        // Re-read every cycle so rate changes apply to the next wait
        changes.borrow_and_update();
        let interval = match schedule(&console, &chart_key) {
            Schedule::Gone => break,
            Schedule::Paused => {
                debug!(chart = %chart_key, "chart_poller_paused");
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                continue;
            }
            Schedule::Every(interval) => interval,
        };

        if let Err(e) = console.platform_chart().refresh_chart(&chart_key).await {
            error!(chart = %chart_key, error = %e, "chart_poller_dispatch_failed");
            break;
        }

        tokio::select! {
            // A dropped poller handle also stops the task
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(chart = %chart_key, "chart_poller_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::Action;
    use crate::domain::chart::Chart;
    use crate::infra::config::Config;
    use crate::infra::session_storage::MemorySessionStorage;
    use crate::io::transport::scripted::ScriptedTransport;

    fn console_with_chart(refresh_interval: Option<u64>) -> Console {
        let console = Console::with_transport(
            Config::default(),
            Arc::new(ScriptedTransport::new()),
            Arc::new(MemorySessionStorage::new()),
        )
        .unwrap();
        let chart: Chart =
            serde_json::from_value(serde_json::json!({ "chartKey": "temp", "refreshInterval": refresh_interval }))
                .unwrap();
        console.dispatch(Action::LoadCharts { charts: vec![chart] }).unwrap();
        console
    }

    #[test]
    fn test_schedule_follows_refresh_interval() {
        assert_eq!(schedule(&console_with_chart(Some(5000)), "temp"), Schedule::Every(Duration::from_secs(5)));
        assert_eq!(schedule(&console_with_chart(None), "temp"), Schedule::Paused);
        assert_eq!(schedule(&console_with_chart(None), "other"), Schedule::Gone);
    }

    #[test]
    fn test_schedule_never_drops_below_minimum() {
        assert_eq!(schedule(&console_with_chart(Some(0)), "temp"), Schedule::Every(MIN_REFRESH_INTERVAL));
        assert_eq!(schedule(&console_with_chart(Some(1)), "temp"), Schedule::Every(MIN_REFRESH_INTERVAL));
    }
}
