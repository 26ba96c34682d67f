//! Command handlers for the device types that accept commands

mod monitor;
mod status;
mod switch;

pub use monitor::MonitorHandler;
pub use status::MonitorStatus;
pub(crate) use status::monitor_status;
pub use switch::{Binding, SwitchHandler};

use crate::command::Reply;
use crate::config::{Command, CommandRegistry, Device, DeviceRegistry};
use crate::error::GatewayResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Monitor command read for the active input
pub const SOURCE_COMMAND: &str = "source";

/// Monitor command read for the power state
pub const POWER_COMMAND: &str = "power";

/// Monitor command read for the video wall mode
pub const VIDEOWALL_COMMAND: &str = "videowall-toggle";

/// Registries shared by all handlers
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub devices: Arc<DeviceRegistry>,
    pub commands: Arc<CommandRegistry>,
}

/// Runs a resolved command against one device
#[async_trait]
pub trait DeviceHandler: Send + Sync {
    async fn handle(
        &self,
        device: &Device,
        command: &Command,
        body: Option<&str>,
    ) -> GatewayResult<Reply>;
}
