//! Matrix switch command handler

use super::{DeviceHandler, HandlerContext, MonitorHandler, SOURCE_COMMAND};
use crate::command::{sources, Reply};
use crate::config::{Command, Device, DeviceType};
use crate::error::{GatewayError, GatewayResult};
use crate::session::MatrixControl;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vidwall_shared::UNBOUND;

/// Switch operation returning the routing table
const STATE_OPERATION: &str = "state";

/// Switch operation connecting a source to a target
const BIND_OPERATION: &str = "bind";

/// `[source, target]` pair per matrix output
pub type Binding = (Option<String>, Option<String>);

/// Runs routing-table reads and binds through the matrix session
pub struct SwitchHandler {
    matrix: Arc<dyn MatrixControl>,
    monitor: Arc<MonitorHandler>,
    ctx: HandlerContext,
}

impl SwitchHandler {
    pub fn new(
        matrix: Arc<dyn MatrixControl>,
        monitor: Arc<MonitorHandler>,
        ctx: HandlerContext,
    ) -> Self {
        Self {
            matrix,
            monitor,
            ctx,
        }
    }

    /// Routing table with the configured client and monitor names per slot
    async fn state(&self) -> GatewayResult<Vec<Binding>> {
        let state = self.matrix.read_state().await?;

        Ok(state
            .iter()
            .enumerate()
            .map(|(slot, input)| {
                let source = match *input {
                    UNBOUND => None,
                    input => self.device_name(DeviceType::Client, input),
                };
                let target = self.device_name(DeviceType::Monitor, slot as i32 + 1);
                (source, target)
            })
            .collect())
    }

    fn device_name(&self, kind: DeviceType, index: i32) -> Option<String> {
        self.ctx
            .devices
            .by_index(kind, index)
            .map(|device| device.name.clone())
    }

    /// Connect a source device to a target device
    ///
    /// Sources bound to a monitor first get the monitor switched to the input
    /// they arrive on. External clients stop there; everything else is then
    /// connected on the matrix.
    async fn bind(&self, body: Option<&str>) -> GatewayResult<bool> {
        let body = body.ok_or_else(|| {
            GatewayError::Validation("bind needs a body of the form 'source,target'".into())
        })?;
        let (source_name, target_name) = body.split_once(',').ok_or_else(|| {
            GatewayError::Validation(format!("Invalid bind request: '{body}'"))
        })?;

        let source = self.resolve(source_name.trim())?;
        let target = self.resolve(target_name.trim())?;

        let wired_to_display = matches!(source.kind, DeviceType::Client | DeviceType::ExtClient);
        if wired_to_display && target.kind == DeviceType::Monitor {
            self.select_input(source, target).await?;

            if source.kind == DeviceType::ExtClient {
                info!("[BIND] '{}' -> '{}' (display input only)", source.name, target.name);
                return Ok(true);
            }
        }

        self.connect(source, target).await?;
        info!("[BIND] '{}' -> '{}'", source.name, target.name);
        Ok(true)
    }

    fn resolve(&self, name: &str) -> GatewayResult<&Device> {
        self.ctx
            .devices
            .get(name)
            .ok_or_else(|| GatewayError::Validation(format!("Unknown device: {name}")))
    }

    /// Switch the monitor to the input the source arrives on, unless it is
    /// already there
    async fn select_input(&self, source: &Device, target: &Device) -> GatewayResult<()> {
        let wanted = match source.kind {
            DeviceType::ExtClient => source.source.as_deref(),
            _ => target.main_source.as_deref(),
        }
        .ok_or_else(|| {
            GatewayError::Configuration(format!(
                "no display input configured for '{}' on '{}'",
                source.name, target.name
            ))
        })?;
        let wanted_code = sources::code_for(wanted).ok_or_else(|| {
            GatewayError::Configuration(format!("unknown source '{wanted}' in configuration"))
        })?;

        let current = self.monitor.run(target, SOURCE_COMMAND, None).await?;
        if current == wanted_code {
            debug!("[BIND] '{}' already on {}", target.name, wanted);
            return Ok(());
        }

        self.monitor
            .run(target, SOURCE_COMMAND, Some(wanted))
            .await?;
        Ok(())
    }

    async fn connect(&self, source: &Device, target: &Device) -> GatewayResult<()> {
        let port = |device: &Device| {
            device.index.ok_or_else(|| {
                GatewayError::Configuration(format!("device '{}' has no matrix index", device.name))
            })
        };
        let input = port(source)?;
        let output = port(target)?;

        if !self.matrix.set(input, output).await? {
            warn!("[BIND] Switch refused {} -> {}", input, output);
            return Err(GatewayError::SwitchRejected { input, output });
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceHandler for SwitchHandler {
    async fn handle(
        &self,
        _device: &Device,
        command: &Command,
        body: Option<&str>,
    ) -> GatewayResult<Reply> {
        match command.id.as_str() {
            STATE_OPERATION => Ok(Reply::Bindings(self.state().await?)),
            BIND_OPERATION => Ok(Reply::Flag(self.bind(body).await?)),
            other => Err(GatewayError::Configuration(format!(
                "unsupported switch operation '{other}'"
            ))),
        }
    }
}
