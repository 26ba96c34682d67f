//! Display control transport
//!
//! Each call opens its own TCP connection to the display, writes one frame,
//! takes the first chunk of data that comes back and closes the connection.
//! Nothing is pooled, queued or retried: two calls to the same display run
//! side by side.

use crate::transport::tcp::TcpConnector;
use crate::transport::traits::{MonitorLink, TransportConnector};
use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, warn};
use vidwall_shared::{codec, timing, CodecError};

/// Outcome of one display exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorReply {
    /// Raw bytes of the first reply chunk
    Response(Bytes),
    /// No reply in time, or the socket failed
    Timeout,
}

/// Sends frames to displays over short-lived TCP connections
#[derive(Debug, Clone)]
pub struct MonitorTransport {
    port: u16,
    deadline: Duration,
}

impl MonitorTransport {
    /// Create a transport for the given control port and per-call deadline
    pub fn new(port: u16, deadline: Duration) -> Self {
        Self { port, deadline }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for MonitorTransport {
    fn default() -> Self {
        Self::new(
            timing::MONITOR_PORT,
            Duration::from_millis(timing::MONITOR_TIMEOUT_MS),
        )
    }
}

#[async_trait]
impl MonitorLink for MonitorTransport {
    async fn execute(
        &self,
        ip: &str,
        device_id: u8,
        command: u8,
        values: &[u8],
    ) -> Result<MonitorReply, CodecError> {
        let frame = codec::encode_frame(device_id, command, values)?;
        let connector = TcpConnector::monitor(ip, self.port);

        debug!(
            "[MONITOR] << {}@{} cmd=0x{:02X} values={:02X?}",
            device_id,
            connector.address(),
            command,
            values
        );

        match timeout(self.deadline, exchange(&connector, &frame)).await {
            Ok(Ok(reply)) => {
                debug!("[MONITOR] >> {}@{} {:02X?}", device_id, connector.address(), &reply[..]);
                Ok(MonitorReply::Response(reply))
            }
            Ok(Err(e)) => {
                warn!("[MONITOR] {}@{} failed: {:#}", device_id, connector.address(), e);
                Ok(MonitorReply::Timeout)
            }
            Err(_) => {
                warn!(
                    "[MONITOR] {}@{} no reply after {}ms",
                    device_id,
                    connector.address(),
                    self.deadline.as_millis()
                );
                Ok(MonitorReply::Timeout)
            }
        }
    }
}

/// Connect, write the frame, return the first inbound chunk
///
/// The stream is dropped on return, which closes the connection.
async fn exchange(connector: &TcpConnector, frame: &[u8]) -> Result<Bytes> {
    let mut stream = connector.connect().await?;
    stream.write_all(frame).await?;

    let mut buf = vec![0u8; 256];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        bail!("display closed the connection without replying");
    }

    buf.truncate(n);
    Ok(Bytes::from(buf))
}
