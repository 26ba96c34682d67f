//! Display command handler

use super::{DeviceHandler, HandlerContext, SOURCE_COMMAND};
use crate::command::{sources, Reply};
use crate::config::{Command, Device, DeviceType};
use crate::error::{GatewayError, GatewayResult};
use crate::transport::{MonitorLink, MonitorReply};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use vidwall_shared::codec;

/// Sends display commands over the binary protocol
pub struct MonitorHandler {
    link: Arc<dyn MonitorLink>,
    ctx: HandlerContext,
}

impl MonitorHandler {
    pub fn new(link: Arc<dyn MonitorLink>, ctx: HandlerContext) -> Self {
        Self { link, ctx }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Run a command and return the raw result byte of the reply
    ///
    /// Without a body this is a read. A body is a comma-separated list of hex
    /// bytes, except for `source` where it is a symbolic source name.
    pub async fn dispatch(
        &self,
        device: &Device,
        command: &Command,
        body: Option<&str>,
    ) -> GatewayResult<u8> {
        let ip = device.ip.as_deref().ok_or_else(|| {
            GatewayError::Configuration(format!("monitor '{}' has no ip", device.name))
        })?;
        let device_id = device.id.ok_or_else(|| {
            GatewayError::Configuration(format!("monitor '{}' has no id", device.name))
        })?;
        let code = parse_hex_byte(&command.id).ok_or_else(|| {
            GatewayError::Configuration(format!(
                "command '{}' has no hex code: '{}'",
                command.name, command.id
            ))
        })?;

        let values = match body {
            None => Vec::new(),
            Some(name) if command.name == SOURCE_COMMAND => {
                let source = sources::code_for(name).ok_or_else(|| {
                    GatewayError::Validation(format!("Unknown source: {name}"))
                })?;
                vec![source]
            }
            Some(body) => parse_values(body)?,
        };

        match self.link.execute(ip, device_id, code, &values).await? {
            MonitorReply::Timeout => Err(GatewayError::TransportTimeout(format!(
                "monitor '{}' did not answer command 0x{:02X}",
                device.name, code
            ))),
            MonitorReply::Response(response) => {
                let reply = codec::decode_ack(&response)?;
                if !reply.ack {
                    warn!(
                        "[MONITOR] '{}' rejected 0x{:02X} (errcode: {})",
                        device.name, code, reply.result
                    );
                    return Err(GatewayError::DeviceNak {
                        command: code,
                        code: reply.result,
                    });
                }

                debug!(
                    "[MONITOR] '{}' ack command=0x{:02X} result={}",
                    device.name, reply.command, reply.result
                );
                Ok(reply.result)
            }
        }
    }

    /// Run a monitor command looked up by name
    pub async fn run(&self, device: &Device, name: &str, body: Option<&str>) -> GatewayResult<u8> {
        let command = self
            .ctx
            .commands
            .get(DeviceType::Monitor, name)
            .ok_or_else(|| {
                GatewayError::Configuration(format!("monitor command '{name}' is not configured"))
            })?;

        self.dispatch(device, command, body).await
    }
}

#[async_trait]
impl DeviceHandler for MonitorHandler {
    async fn handle(
        &self,
        device: &Device,
        command: &Command,
        body: Option<&str>,
    ) -> GatewayResult<Reply> {
        let result = self.dispatch(device, command, body).await?;

        if command.name == SOURCE_COMMAND && body.is_none() {
            return Ok(Reply::Source(sources::name_for(result)));
        }
        Ok(Reply::Number(result.into()))
    }
}

/// `"11"` or `"0x11"`
fn parse_hex_byte(token: &str) -> Option<u8> {
    let token = token.trim();
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u8::from_str_radix(digits, 16).ok()
}

/// `"1,0x21,ff"` into bytes
fn parse_values(body: &str) -> GatewayResult<Vec<u8>> {
    body.split(',')
        .map(|token| {
            parse_hex_byte(token)
                .ok_or_else(|| GatewayError::Validation(format!("Invalid value: '{token}'")))
        })
        .collect()
}
