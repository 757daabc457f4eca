//! Action creators - the only callers of the RPC client
//!
//! Each creator borrows the `Console`, performs its calls and dispatches the
//! resulting actions:
//! - `platform_manager` - login/logout, platform list, (de)registration
//! - `platform` - agents and saved charts of one platform
//! - `platform_chart` - chart edits and historian queries
//! - `platforms_panel` - side panel loading, filtering and checking
//! - `status_indicator` - banner open/close
//! - `chart_poller` - periodic refresh of one chart
//!
//! RPC failures become an error banner. `DispatchError`s are returned.

pub mod chart_poller;
pub mod platform;
pub mod platform_chart;
pub mod platform_manager;
pub mod platforms_panel;
pub mod status_indicator;

// Re-export commonly used types
pub use chart_poller::ChartPoller;
pub use platform::PlatformActions;
pub use platform_chart::PlatformChartActions;
pub use platform_manager::{PlatformManagerActions, RegistrationMethod};
pub use platforms_panel::PlatformsPanelActions;
pub use status_indicator::StatusIndicatorActions;

use crate::app::Console;
use crate::io::rpc_error::RpcError;

/// Banner text for a failed historian call
///
/// `unavailable` replaces the server message when the historian reports
/// itself missing, or when any other failure hits a platform whose historian
/// is not running.
fn historian_message(console: &Console, error: &RpcError, prefix: &str, unavailable: &str, platform_uuid: &str) -> String {
    if error.is_historian_unavailable() {
        return format!("{prefix}{unavailable}");
    }
    if error.code() != Some(crate::io::rpc_error::INVALID_PARAMS)
        && !console.platforms().read().get_historian_running(platform_uuid)
    {
        return format!("{prefix}{unavailable}");
    }
    format!("{prefix}{}", error.message())
}
