//! Request resolution and dispatch by device type

use super::handlers::{
    self, Binding, DeviceHandler, HandlerContext, MonitorHandler, MonitorStatus, SwitchHandler,
};
use super::sources::Source;
use crate::config::{Command, CommandRegistry, DeviceRegistry, DeviceType};
use crate::error::{GatewayError, GatewayResult};
use crate::session::MatrixControl;
use crate::transport::MonitorLink;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// One device request as extracted by the HTTP layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Request {
    pub device: String,
    /// Absent for a bare status query
    pub command: Option<String>,
    /// Present for writes
    pub body: Option<String>,
}

impl Request {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Number(i64),
    Flag(bool),
    Source(Source),
    Bindings(Vec<Binding>),
    Status(MonitorStatus),
}

/// Routes requests to the handler registered for the device's type
pub struct DeviceRouter {
    devices: Arc<DeviceRegistry>,
    commands: Arc<CommandRegistry>,
    monitor: Arc<MonitorHandler>,
    matrix: Arc<dyn MatrixControl>,
    handlers: HashMap<DeviceType, Arc<dyn DeviceHandler>>,
}

impl DeviceRouter {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        commands: Arc<CommandRegistry>,
        link: Arc<dyn MonitorLink>,
        matrix: Arc<dyn MatrixControl>,
    ) -> Self {
        let ctx = HandlerContext {
            devices: devices.clone(),
            commands: commands.clone(),
        };
        let monitor = Arc::new(MonitorHandler::new(link, ctx.clone()));
        let switch = Arc::new(SwitchHandler::new(matrix.clone(), monitor.clone(), ctx));

        let mut handlers: HashMap<DeviceType, Arc<dyn DeviceHandler>> = HashMap::new();
        handlers.insert(DeviceType::Monitor, monitor.clone());
        handlers.insert(DeviceType::Switch, switch);

        Self {
            devices,
            commands,
            monitor,
            matrix,
            handlers,
        }
    }

    /// Resolve, validate and run one request
    ///
    /// Unknown devices and commands, and bodies outside the command's
    /// whitelist, are rejected before any device is contacted.
    pub async fn handle(&self, request: &Request) -> GatewayResult<Reply> {
        let device = self.devices.get(&request.device).ok_or_else(|| {
            GatewayError::Validation(format!("Unknown device: {}", request.device))
        })?;

        let Some(name) = request.command.as_deref() else {
            if device.kind != DeviceType::Monitor {
                return Err(GatewayError::Validation(format!(
                    "No command given for {} '{}'",
                    device.kind, device.name
                )));
            }
            info!("[ROUTER] status {}", device.name);
            let status =
                handlers::monitor_status(&self.monitor, self.matrix.as_ref(), device).await?;
            return Ok(Reply::Status(status));
        };

        let command = self
            .commands
            .get(device.kind, name)
            .ok_or_else(|| GatewayError::Validation(format!("Unknown command: {name}")))?;

        let body = request.body.as_deref();
        if let Some(body) = body {
            if !command.allows(body) {
                return Err(GatewayError::Validation(format!(
                    "Unknown request body: {body} - must be one of [{}]",
                    whitelist(command)
                )));
            }
        }

        let handler = self.handlers.get(&device.kind).ok_or_else(|| {
            GatewayError::Validation(format!("{} devices accept no commands", device.kind))
        })?;

        info!(
            "[ROUTER] {} {} {}",
            device.name,
            command.name,
            body.unwrap_or_default()
        );
        handler.handle(device, command, body).await
    }
}

fn whitelist(command: &Command) -> String {
    command
        .values
        .iter()
        .flatten()
        .map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fakes::{ack, nak, registries, FakeMatrix, FakeMonitor};
    use crate::transport::MonitorReply;

    fn router(monitor: Arc<FakeMonitor>, matrix: Arc<FakeMatrix>) -> DeviceRouter {
        let (devices, commands) = registries();
        DeviceRouter::new(devices, commands, monitor, matrix)
    }

    fn echo(command: u8, values: &[u8]) -> MonitorReply {
        ack(command, values.first().copied().unwrap_or(0x01))
    }

    #[tokio::test]
    async fn test_unknown_device_and_command() {
        let monitor = FakeMonitor::new(echo);
        let router = router(monitor.clone(), FakeMatrix::new([-1; 8]));

        let result = router.handle(&Request::new("wall-9").command("power")).await;
        assert_eq!(
            result,
            Err(GatewayError::Validation("Unknown device: wall-9".into()))
        );

        let result = router.handle(&Request::new("wall-1").command("volume")).await;
        assert_eq!(
            result,
            Err(GatewayError::Validation("Unknown command: volume".into()))
        );

        // Switch commands are not monitor commands
        let result = router.handle(&Request::new("wall-1").command("bind")).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));

        assert!(monitor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_body_outside_whitelist() {
        let monitor = FakeMonitor::new(echo);
        let router = router(monitor.clone(), FakeMatrix::new([-1; 8]));

        let request = Request::new("wall-1").command("power").body("2");
        let error = router.handle(&request).await.unwrap_err();

        assert_eq!(error.status(), 405);
        assert_eq!(
            error.to_string(),
            "Unknown request body: 2 - must be one of [0,1]"
        );
        assert!(monitor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_monitor_write() {
        let monitor = FakeMonitor::new(echo);
        let router = router(monitor.clone(), FakeMatrix::new([-1; 8]));

        let request = Request::new("wall-2").command("power").body("0");
        assert_eq!(router.handle(&request).await, Ok(Reply::Number(0)));
        assert_eq!(
            monitor.calls(),
            vec![("192.168.35.162".to_string(), 2, 0x11, vec![0x00])]
        );
    }

    #[tokio::test]
    async fn test_source_read_and_write() {
        let monitor = FakeMonitor::new(echo);
        let router = router(monitor.clone(), FakeMatrix::new([-1; 8]));

        let request = Request::new("wall-1").command("source").body("hdmi2");
        assert_eq!(router.handle(&request).await, Ok(Reply::Number(0x23)));
        assert_eq!(monitor.calls()[0].3, vec![0x23]);

        let request = Request::new("wall-1").command("source");
        let reply = router.handle(&request).await.expect("read failed");
        // 0x01 is not in the catalog
        assert_eq!(serde_json::to_string(&reply).unwrap(), "1");
    }

    #[tokio::test]
    async fn test_nak_is_reported() {
        let monitor = FakeMonitor::new(|command, _| nak(command, 0x03));
        let router = router(monitor, FakeMatrix::new([-1; 8]));

        let error = router
            .handle(&Request::new("wall-1").command("power"))
            .await
            .unwrap_err();
        assert_eq!(error.tagged().status, 502);
        assert_eq!(error.tagged().message, "Device rejected command 0x11: ERR_3");
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let monitor = FakeMonitor::new(|_, _| MonitorReply::Timeout);
        let router = router(monitor, FakeMatrix::new([-1; 8]));

        let error = router
            .handle(&Request::new("wall-1").command("power"))
            .await
            .unwrap_err();
        assert_eq!(error.status(), 504);
    }

    #[tokio::test]
    async fn test_bare_monitor_query_is_status() {
        let monitor = FakeMonitor::new(|command, _| match command {
            0x14 => ack(command, 0x25),
            _ => ack(command, 0x01),
        });
        let matrix = FakeMatrix::new([1, -1, -1, -1, -1, -1, -1, -1]);
        let router = router(monitor.clone(), matrix.clone());

        let reply = router
            .handle(&Request::new("wall-1"))
            .await
            .expect("status failed");

        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({
                "power": 1,
                "source": "displayport",
                "desktop": "pc-1",
                "videowall": 1
            })
        );
        assert_eq!(monitor.calls().len(), 3);
        assert_eq!(matrix.reads(), 1);
    }

    #[tokio::test]
    async fn test_bare_query_needs_a_monitor() {
        let router = router(FakeMonitor::new(echo), FakeMatrix::new([-1; 8]));

        let result = router.handle(&Request::new("matrix")).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_clients_accept_no_commands() {
        let router = router(FakeMonitor::new(echo), FakeMatrix::new([-1; 8]));

        let result = router.handle(&Request::new("pc-1").command("power")).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_switch_state_serializes_as_pairs() {
        let matrix = FakeMatrix::new([2, -1, -1, -1, -1, -1, -1, -1]);
        let router = router(FakeMonitor::new(echo), matrix);

        let reply = router
            .handle(&Request::new("matrix").command("state"))
            .await
            .expect("state failed");

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json[0], serde_json::json!(["pc-2", "wall-1"]));
        assert_eq!(json[1], serde_json::json!([null, "wall-2"]));
        assert_eq!(json.as_array().map(Vec::len), Some(8));
    }

    #[tokio::test]
    async fn test_switch_bind() {
        let monitor = FakeMonitor::new(|command, values| match values.first() {
            Some(value) => ack(command, *value),
            None => ack(command, 0x21),
        });
        let matrix = FakeMatrix::new([-1; 8]);
        let router = router(monitor.clone(), matrix.clone());

        let request = Request::new("matrix").command("bind").body("pc-2,wall-1");
        assert_eq!(router.handle(&request).await, Ok(Reply::Flag(true)));

        // Already on hdmi1, so only the source read reached the display
        assert_eq!(monitor.calls().len(), 1);
        assert_eq!(matrix.set_calls(), vec![(2, 1)]);
    }
}
