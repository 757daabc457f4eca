//! Services - stores holding console state
//!
//! Every store reacts to dispatched actions and exposes read-only getters:
//! - `authorization_store` - session token and username
//! - `platforms_store` - registered platforms and their agents
//! - `platform_chart_store` - charts, series and the chartable topic catalogue
//! - `panel_items` - the platforms-panel tree
//! - `platforms_panel_store` - side panel open/closed
//! - `status_indicator_store` - success/error banner
//! - `exchange_log_store` - recent RPC exchanges

pub mod authorization_store;
pub mod exchange_log_store;
pub mod panel_items;
pub mod platform_chart_store;
pub mod platforms_panel_store;
pub mod platforms_store;
pub mod status_indicator_store;

// Re-export commonly used types
pub use authorization_store::AuthorizationStore;
pub use exchange_log_store::{ExchangeEntry, ExchangeLogStore, ExchangeOutcome};
pub use panel_items::{ItemFilter, PlatformsPanelItemsStore};
pub use platform_chart_store::{ChartDefaults, PlatformChartStore};
pub use platforms_panel_store::PlatformsPanelStore;
pub use platforms_store::PlatformsStore;
pub use status_indicator_store::StatusIndicatorStore;
