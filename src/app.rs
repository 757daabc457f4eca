//! Console wiring: dispatcher, stores and the RPC client
//!
//! `Console` owns one dispatcher with every store registered in dependency
//! order. Action creators borrow it through the accessor methods.

use crate::actions::{
    PlatformActions, PlatformChartActions, PlatformManagerActions, PlatformsPanelActions,
    StatusIndicatorActions,
};
use crate::domain::action::Action;
use crate::domain::types::StatusKind;
use crate::infra::config::Config;
use crate::infra::dispatcher::{DispatchError, Dispatcher};
use crate::infra::session_storage::{FileSessionStorage, SessionStorage};
use crate::infra::store::StoreHandle;
use crate::io::exchange::{RpcClient, RpcRequest};
use crate::io::rpc_error::RpcError;
use crate::io::transport::{HttpTransport, Transport};
use crate::services::{
    AuthorizationStore, ChartDefaults, ExchangeLogStore, PlatformChartStore, PlatformsPanelItemsStore,
    PlatformsPanelStore, PlatformsStore, StatusIndicatorStore,
};
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

pub struct Console {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    rpc: RpcClient,
    authorization: StoreHandle<AuthorizationStore>,
    status_indicator: StoreHandle<StatusIndicatorStore>,
    exchanges: StoreHandle<ExchangeLogStore>,
    platforms_panel: StoreHandle<PlatformsPanelStore>,
    platforms: StoreHandle<PlatformsStore>,
    charts: StoreHandle<PlatformChartStore>,
    panel_items: StoreHandle<PlatformsPanelItemsStore>,
}

impl Console {
    /// Console talking HTTP to `server.url` with a file-backed session
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config).context("Failed to build HTTP client")?;
        let storage = FileSessionStorage::open(config.session_file())
            .with_context(|| format!("Failed to open session file: {}", config.session_file().display()))?;
        Self::with_transport(config, Arc::new(transport), Arc::new(storage))
            .context("Failed to register stores")
    }

    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, DispatchError> {
        let dispatcher = Arc::new(Dispatcher::new());

        // The session is rehydrated before anything else is registered
        let authorization = StoreHandle::new(AuthorizationStore::new(storage));
        let status_indicator = StoreHandle::new(StatusIndicatorStore::new());
        let exchanges = StoreHandle::new(ExchangeLogStore::new(config.max_exchanges()));
        let platforms_panel = StoreHandle::new(PlatformsPanelStore::new());
        let platforms = StoreHandle::new(PlatformsStore::new());
        let charts = StoreHandle::new(PlatformChartStore::new(
            platforms.clone(),
            ChartDefaults {
                refresh_interval_ms: config.default_refresh_interval_ms(),
                data_length: config.default_data_length(),
            },
        ));
        let panel_items = StoreHandle::new(PlatformsPanelItemsStore::new(charts.clone()));

        let auth_token = dispatcher.register_store("authorization", &[], &authorization)?;
        dispatcher.register_store("status_indicator", &[], &status_indicator)?;
        dispatcher.register_store("exchange_log", &[auth_token], &exchanges)?;
        dispatcher.register_store("platforms_panel", &[], &platforms_panel)?;
        let platforms_token = dispatcher.register_store("platforms", &[auth_token], &platforms)?;
        let charts_token =
            dispatcher.register_store("platform_chart", &[auth_token, platforms_token], &charts)?;
        dispatcher.register_store("platforms_panel_items", &[auth_token, charts_token], &panel_items)?;

        info!(
            server_url = %config.server_url(),
            reducers = dispatcher.reducer_names().len(),
            authorized = authorization.read().get_authorization().is_some(),
            "console_initialized"
        );

        let rpc = RpcClient::new(transport, Arc::clone(&dispatcher));
        Ok(Self {
            config,
            dispatcher,
            rpc,
            authorization,
            status_indicator,
            exchanges,
            platforms_panel,
            platforms,
            charts,
            panel_items,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatch(&self, action: Action) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(action)
    }

    /// Call `method` with the current session token attached
    pub async fn request<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, RpcError> {
        let token = self.authorization.read().get_authorization().map(str::to_string);
        self.rpc.call(request.with_authorization(token)).await
    }

    /// Call without attaching the session token
    pub(crate) async fn request_anonymous<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, RpcError> {
        self.rpc.call(request).await
    }

    /// Show `message` for a failed call
    ///
    /// Unauthorized failures were already turned into a logout by the RPC
    /// client and show nothing; dispatch failures are returned.
    pub(crate) fn report_failure(&self, error: RpcError, message: String) -> Result<(), DispatchError> {
        match error {
            RpcError::Dispatch(e) => Err(e),
            e if e.is_unauthorized() => Ok(()),
            _ => self.status_indicator().open_status_indicator(StatusKind::Error, message),
        }
    }

    // Stores

    pub fn authorization(&self) -> &StoreHandle<AuthorizationStore> {
        &self.authorization
    }

    pub fn status_indicator_store(&self) -> &StoreHandle<StatusIndicatorStore> {
        &self.status_indicator
    }

    pub fn exchanges(&self) -> &StoreHandle<ExchangeLogStore> {
        &self.exchanges
    }

    pub fn platforms_panel(&self) -> &StoreHandle<PlatformsPanelStore> {
        &self.platforms_panel
    }

    pub fn platforms(&self) -> &StoreHandle<PlatformsStore> {
        &self.platforms
    }

    pub fn charts(&self) -> &StoreHandle<PlatformChartStore> {
        &self.charts
    }

    pub fn panel_items(&self) -> &StoreHandle<PlatformsPanelItemsStore> {
        &self.panel_items
    }

    // Action creators

    pub fn platform_manager(&self) -> PlatformManagerActions<'_> {
        PlatformManagerActions::new(self)
    }

    pub fn platform(&self) -> PlatformActions<'_> {
        PlatformActions::new(self)
    }

    pub fn platform_chart(&self) -> PlatformChartActions<'_> {
        PlatformChartActions::new(self)
    }

    pub fn platforms_panel_actions(&self) -> PlatformsPanelActions<'_> {
        PlatformsPanelActions::new(self)
    }

    pub fn status_indicator(&self) -> StatusIndicatorActions<'_> {
        StatusIndicatorActions::new(self)
    }
}
