//! Transport seams between the router and the hardware links

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use vidwall_shared::CodecError;

use super::monitor::MonitorReply;

/// Factory for creating transport connections
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// The stream type this connector produces
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Attempt to connect, returning a stream on success
    async fn connect(&self) -> Result<Self::Stream>;

    /// Human-readable name for this transport
    fn name(&self) -> &str;
}

/// One-shot request/response exchange with a display
#[async_trait]
pub trait MonitorLink: Send + Sync {
    /// Send one frame and wait for the first reply chunk
    ///
    /// Socket failures and missing replies both come back as
    /// [`MonitorReply::Timeout`]; only encoding problems are errors.
    async fn execute(
        &self,
        ip: &str,
        device_id: u8,
        command: u8,
        values: &[u8],
    ) -> Result<MonitorReply, CodecError>;
}
