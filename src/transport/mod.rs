pub mod monitor;
pub mod tcp;
pub mod traits;

pub use monitor::{MonitorReply, MonitorTransport};
pub use tcp::TcpConnector;
pub use traits::{MonitorLink, TransportConnector};
