//! TCP transport for displays and the matrix switch

use crate::transport::traits::TransportConnector;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::net::TcpStream;

/// TCP connector for one fixed address
pub struct TcpConnector {
    address: String,
    name: &'static str,
}

impl TcpConnector {
    /// Create a connector for a display control port
    pub fn monitor(ip: &str, port: u16) -> Self {
        Self {
            address: format!("{ip}:{port}"),
            name: "Monitor",
        }
    }

    /// Create a connector for the matrix switch telnet service
    pub fn switch(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: "Switch",
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl TransportConnector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<Self::Stream> {
        let stream = TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("connect to {} failed", self.address))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn name(&self) -> &str {
        self.name
    }
}
