//! Session and platform registration

use crate::app::Console;
use crate::domain::action::{Action, ChartItem};
use crate::domain::chart::Chart;
use crate::domain::types::{Platform, StatusKind};
use crate::infra::dispatcher::DispatchError;
use crate::io::exchange::RpcRequest;
use crate::io::rpc_error::RpcError;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, info};

/// JSON-RPC code for an invalid request; returned for a bad address
const INVALID_ADDRESS: i64 = -32600;
const REGISTRATION_REFUSED: i64 = -32002;
const SERVER_ERROR: i64 = -32000;

/// How a platform is reached when registering it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMethod {
    /// `register_instance` with a discovery address
    Discovery,
    /// `register_platform` with a raw agent address
    Advanced,
}

impl FromStr for RegistrationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(RegistrationMethod::Discovery),
            "advanced" => Ok(RegistrationMethod::Advanced),
            other => Err(format!("unknown registration method: {other}")),
        }
    }
}

/// Banner text for a failed registration
fn registration_message(name: &str, error: &RpcError) -> String {
    match error.code() {
        Some(INVALID_ADDRESS) => format!("Platform {name} was not registered: Invalid address."),
        Some(REGISTRATION_REFUSED) => format!("Platform {name} was not registered: {}", error.message()),
        Some(SERVER_ERROR) => format!("Platform {name} was not registered: An unknown error occurred."),
        _ => error.message(),
    }
}

pub struct PlatformManagerActions<'a> {
    console: &'a Console,
}

impl<'a> PlatformManagerActions<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Load the platforms when a session is already present
    pub async fn initialize(&self) -> Result<(), DispatchError> {
        if self.console.authorization().read().get_authorization().is_none() {
            return Ok(());
        }
        self.load_platforms().await
    }

    pub async fn request_authorization(&self, username: &str, password: &str) -> Result<(), DispatchError> {
        let request = RpcRequest::new("get_authorization")
            .with_params(json!({ "username": username, "password": password }))
            .redact("password");

        match self.console.request_anonymous::<String>(request).await {
            Ok(token) => {
                self.console.dispatch(Action::ReceiveAuthorization { token, username: username.to_string() })?;
                self.initialize().await
            }
            Err(RpcError::Dispatch(e)) => Err(e),
            Err(e) => {
                // A rejected login is the one unauthorized failure that shows a banner
                let message = if e.http_status() == Some(401) {
                    "Invalid username/password specified.".to_string()
                } else {
                    e.message()
                };
                info!(username = %username, error = %e, "login_failed");
                self.console.status_indicator().open_status_indicator(StatusKind::Error, message)
            }
        }
    }

    pub fn clear_authorization(&self) -> Result<(), DispatchError> {
        self.console.dispatch(Action::ClearAuthorization)
    }

    /// Platform list, then the agents of every platform and the saved charts
    pub async fn load_platforms(&self) -> Result<(), DispatchError> {
        let platforms: Vec<Platform> = match self.console.request(RpcRequest::new("list_platforms")).await {
            Ok(platforms) => platforms,
            Err(e) => {
                let message = e.message();
                return self.console.report_failure(e, message);
            }
        };
        info!(count = platforms.len(), "platforms_loaded");

        self.console.dispatch(Action::ReceivePlatforms { platforms: platforms.clone() })?;
        self.console.dispatch(Action::ReceivePlatformStatuses { platforms: platforms.clone() })?;

        let actions = self.console.platform();
        for platform in &platforms {
            actions.load_agents(platform).await?;
        }
        actions.load_charts().await
    }

    pub async fn register_platform(
        &self,
        name: &str,
        address: &str,
        method: RegistrationMethod,
    ) -> Result<(), DispatchError> {
        let request = match method {
            RegistrationMethod::Discovery => RpcRequest::new("register_instance")
                .with_params(json!({ "display_name": name, "discovery_address": address })),
            RegistrationMethod::Advanced => RpcRequest::new("register_platform")
                .with_params(json!({ "identity": "platform.agent", "agentId": name, "address": address })),
        };

        match self.console.request::<Value>(request).await {
            Ok(_) => {
                info!(name = %name, method = ?method, "platform_registered");
                self.console
                    .status_indicator()
                    .open_status_indicator(StatusKind::Success, format!("Platform {name} was registered."))?;
                self.load_platforms().await
            }
            Err(e) => {
                let message = registration_message(name, &e);
                self.console.report_failure(e, message)
            }
        }
    }

    /// Unregister the platform and drop its series from every user's saved charts
    pub async fn deregister_platform(&self, platform: &Platform) -> Result<(), DispatchError> {
        let request =
            RpcRequest::new("unregister_platform").with_params(json!({ "platform_uuid": platform.uuid }));

        match self.console.request::<Value>(request).await {
            Ok(_) => {
                info!(platform = %platform.uuid, name = %platform.name, "platform_deregistered");
                self.console.status_indicator().open_status_indicator(
                    StatusKind::Success,
                    format!("Platform {} was deregistered.", platform.name),
                )?;
                self.remove_platform_from_charts(platform).await?;
                self.load_platforms().await
            }
            Err(e) => {
                let message = format!("Platform {} was not deregistered: {}", platform.name, e.message());
                self.console.report_failure(e, message)
            }
        }
    }

    /// Remove series of `platform` from the live charts and every saved setting
    async fn remove_platform_from_charts(&self, platform: &Platform) -> Result<(), DispatchError> {
        let live: Vec<ChartItem> = self
            .console
            .charts()
            .read()
            .get_data()
            .iter()
            .flat_map(|chart| {
                chart
                    .series
                    .iter()
                    .filter(|s| s.parent_uuid == platform.uuid)
                    .map(|s| ChartItem::from_series(&chart.chart_key, s))
                    .collect::<Vec<_>>()
            })
            .collect();
        for item in live {
            self.console.dispatch(Action::RemoveFromChart { item })?;
        }

        let failure = |e: &RpcError| format!("Unable to update saved charts for platform {}: {}", platform.name, e.message());
        let keys: Vec<String> = match self.console.request(RpcRequest::new("get_setting_keys")).await {
            Ok(keys) => keys,
            Err(e) => {
                let message = failure(&e);
                return self.console.report_failure(e, message);
            }
        };

        for key in keys {
            let request = RpcRequest::new("get_setting").with_params(json!({ "key": key }));
            let saved = match self.console.request::<Option<Vec<Chart>>>(request).await {
                Ok(saved) => saved.unwrap_or_default(),
                // Settings that are not chart lists are left alone
                Err(RpcError::Decode(_)) => continue,
                Err(e) => {
                    let message = failure(&e);
                    return self.console.report_failure(e, message);
                }
            };

            let (kept, changed) = without_platform(saved, &platform.uuid);
            if !changed {
                continue;
            }
            let value = match serde_json::to_value(&kept) {
                Ok(value) => value,
                Err(e) => {
                    let error = RpcError::Decode(e.to_string());
                    let message = failure(&error);
                    return self.console.report_failure(error, message);
                }
            };
            let request = RpcRequest::new("set_setting").with_params(json!({ "key": key, "value": value }));
            if let Err(e) = self.console.request::<Value>(request).await {
                let message = failure(&e);
                return self.console.report_failure(e, message);
            }
            debug!(key = %key, charts = kept.len(), "saved_charts_swept");
        }
        Ok(())
    }
}

/// Charts without series of `platform_uuid`; charts left empty are dropped
fn without_platform(charts: Vec<Chart>, platform_uuid: &str) -> (Vec<Chart>, bool) {
    let mut changed = false;
    let kept = charts
        .into_iter()
        .filter_map(|mut chart| {
            let before = chart.series.len();
            chart.series.retain(|s| s.parent_uuid != platform_uuid);
            changed |= chart.series.len() != before;
            (!chart.series.is_empty()).then_some(chart)
        })
        .collect();
    (kept, changed)
}
