mod command;
mod config;
mod error;
mod session;
mod transport;

use anyhow::{bail, Result};
use command::{DeviceRouter, Request};
use config::GatewayConfig;
use session::{LinkStatus, MatrixSession, SessionSettings};
use std::sync::Arc;
use transport::{MonitorTransport, TcpConnector};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage: vidwall-gateway <config.json> <device> [command] [body]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(device)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let mut request = Request::new(device);
    if let Some(command) = args.next() {
        request = request.command(command);
    }
    if let Some(body) = args.next() {
        request = request.body(body);
    }

    let config = GatewayConfig::load(&config_path)?;
    let (devices, commands) = config.registries();
    info!("Video wall gateway starting: {} devices", devices.len());
    if devices.is_empty() {
        warn!("No devices configured, every request will be rejected");
    }
    info!("  Switch: {}", config.switch.address);

    let matrix = MatrixSession::start(
        TcpConnector::switch(config.switch.address.clone()),
        SessionSettings::from_config(&config.switch, &config.timing),
    );
    matrix.wait_connected().await;
    match matrix.status() {
        LinkStatus::Up => info!("Matrix switch session up"),
        status => warn!(
            "Matrix switch {:?}, switch commands will fail until it reconnects",
            status
        ),
    }

    let link = MonitorTransport::new(config.monitor_port, config.timing.monitor_timeout());
    info!("  Displays on port {}", link.port());
    let router = DeviceRouter::new(
        Arc::new(devices),
        Arc::new(commands),
        Arc::new(link),
        Arc::new(matrix),
    );

    match router.handle(&request).await {
        Ok(reply) => println!("{}", serde_json::to_string(&reply)?),
        Err(e) => {
            error!("Request failed: {}", e);
            println!("{}", serde_json::to_string(&e.tagged())?);
        }
    }

    Ok(())
}
