//! Handle to the matrix switch session and its typed operations

use super::connection::{connection_loop, LinkStatus, Reply};
use super::MatrixControl;
use crate::config::{SwitchConfig, TimingConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::transport::TransportConnector;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;
use vidwall_shared::matrix::{self, MatrixState};

/// One command waiting for the session actor
pub(super) struct SessionRequest {
    pub command: String,
    pub reply: Reply,
}

/// Credentials and timing of the switch session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub username: String,
    pub password: String,
    pub command_timeout: Duration,
    pub settle_delay: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl SessionSettings {
    pub fn from_config(switch: &SwitchConfig, timing: &TimingConfig) -> Self {
        Self {
            username: switch.username.clone(),
            password: switch.password.clone(),
            command_timeout: timing.command_timeout(),
            settle_delay: timing.settle_delay(),
            reconnect_delay: timing.reconnect_delay(),
            max_reconnect_delay: timing.max_reconnect_delay(),
        }
    }
}

/// Cloneable handle to the switch session actor
///
/// Commands from every handle go through one FIFO queue; only one of them is
/// on the wire at any time.
#[derive(Clone)]
pub struct MatrixSession {
    request_tx: mpsc::UnboundedSender<SessionRequest>,
    status_rx: watch::Receiver<LinkStatus>,
}

impl MatrixSession {
    /// Spawn the session actor and start connecting
    pub fn start<C: TransportConnector>(connector: C, settings: SessionSettings) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(LinkStatus::Connecting);

        tokio::spawn(async move {
            connection_loop(connector, settings, request_rx, status_tx).await;
        });

        Self {
            request_tx,
            status_rx,
        }
    }

    /// Wait for the first connection attempt; `true` if it succeeded
    pub async fn wait_connected(&self) -> bool {
        let mut status_rx = self.status_rx.clone();
        // The borrowed status must be released before `status_rx` drops
        let up = match status_rx
            .wait_for(|status| *status != LinkStatus::Connecting)
            .await
        {
            Ok(status) => *status == LinkStatus::Up,
            Err(_) => false,
        };
        up
    }

    /// Current connection status
    pub fn status(&self) -> LinkStatus {
        *self.status_rx.borrow()
    }

    /// Queue a raw command; the receiver yields its payload lines
    pub fn submit(
        &self,
        command: impl Into<String>,
    ) -> oneshot::Receiver<GatewayResult<Vec<String>>> {
        let (reply, rx) = oneshot::channel();
        let request = SessionRequest {
            command: command.into(),
            reply,
        };

        if let Err(mpsc::error::SendError(request)) = self.request_tx.send(request) {
            let _ = request
                .reply
                .send(Err(GatewayError::TransportFailure("switch session stopped".into())));
        }

        rx
    }

    /// Queue a raw command and wait for its payload lines
    pub async fn execute(&self, command: impl Into<String>) -> GatewayResult<Vec<String>> {
        self.submit(command).await.map_err(|_| {
            GatewayError::TransportFailure("switch session dropped the command".into())
        })?
    }
}

#[async_trait]
impl MatrixControl for MatrixSession {
    async fn read_state(&self) -> GatewayResult<MatrixState> {
        let lines = self.execute(matrix::read_state_command()).await?;
        matrix::parse_state(&lines).map_err(|e| {
            warn!("[TELNET] Invalid response to 'read': {}", e);
            e.into()
        })
    }

    async fn read_out(&self, output: u8) -> GatewayResult<i32> {
        let lines = self.execute(matrix::read_out_command(output)).await?;
        matrix::parse_read_out(&lines).map_err(|e| {
            warn!("[TELNET] Invalid response to 'ro {:02}': {}", output, e);
            e.into()
        })
    }

    async fn read_in(&self, input: u8) -> GatewayResult<i32> {
        let lines = self.execute(matrix::read_in_command(input)).await?;
        matrix::parse_read_in(&lines).map_err(|e| {
            warn!("[TELNET] Invalid response to 'ri {:02}': {}", input, e);
            e.into()
        })
    }

    async fn set(&self, input: u8, output: u8) -> GatewayResult<bool> {
        let lines = self.execute(matrix::set_command(input, output)).await?;
        let switched = matrix::parse_switch(&lines)?;
        if !switched {
            warn!("[TELNET] Switch refused 'ss {:02},{:02}': {:?}", input, output, lines);
        }
        Ok(switched)
    }
}
