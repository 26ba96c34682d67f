//! Status snapshot of a monitor

use super::{MonitorHandler, POWER_COMMAND, SOURCE_COMMAND, VIDEOWALL_COMMAND};
use crate::command::sources::{self, Source};
use crate::config::{Device, DeviceType};
use crate::error::GatewayResult;
use crate::session::MatrixControl;
use serde::Serialize;
use tracing::debug;

/// Everything a bare monitor query reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    pub power: u8,
    pub source: Source,
    /// Client routed to the monitor's matrix output, if any
    pub desktop: Option<String>,
    pub videowall: u8,
}

/// Read power, source and video wall mode from the monitor and its routed
/// client from the switch, all at once
pub(crate) async fn monitor_status(
    monitor: &MonitorHandler,
    matrix: &dyn MatrixControl,
    device: &Device,
) -> GatewayResult<MonitorStatus> {
    let (power, source, videowall, desktop) = futures::try_join!(
        monitor.run(device, POWER_COMMAND, None),
        monitor.run(device, SOURCE_COMMAND, None),
        monitor.run(device, VIDEOWALL_COMMAND, None),
        routed_client(monitor, matrix, device),
    )?;

    debug!("[STATUS] '{}' power={} source=0x{:02X}", device.name, power, source);

    Ok(MonitorStatus {
        power,
        source: sources::name_for(source),
        desktop,
        videowall,
    })
}

/// Client feeding the monitor's matrix output
async fn routed_client(
    monitor: &MonitorHandler,
    matrix: &dyn MatrixControl,
    device: &Device,
) -> GatewayResult<Option<String>> {
    let Some(output) = device.index else {
        return Ok(None);
    };

    let input = matrix.read_out(output).await?;
    Ok(monitor
        .context()
        .devices
        .by_index(DeviceType::Client, input)
        .map(|client| client.name.clone()))
}
