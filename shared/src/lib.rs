//! Video Wall Shared Protocol Types
//!
//! This crate provides the wire-level pieces used by the gateway to talk to
//! its two kinds of hardware:
//! - the checksum-framed binary protocol spoken by the flat-panel displays
//! - the line-oriented telnet protocol spoken by the video matrix switch
//!
//! Nothing in here performs I/O; the gateway owns the sockets.

pub mod codec;
pub mod matrix;
pub mod state_machine;
pub mod telnet;

pub use codec::{AckReply, CodecError, MonitorFrame};
pub use matrix::{MatrixState, ParseError, MATRIX_OUTPUTS, UNBOUND};
pub use state_machine::{FailReason, SessionAction, SessionEvent, SessionState, SessionStateMachine};
pub use telnet::{FramerError, ResponseFramer};

/// Ports and timing observed on the installed hardware
pub mod timing {
    /// TCP port of the display control protocol
    pub const MONITOR_PORT: u16 = 1515;

    /// TCP port of the matrix switch telnet service
    pub const TELNET_PORT: u16 = 23;

    /// Hard deadline for one display request/response exchange
    pub const MONITOR_TIMEOUT_MS: u64 = 5000;

    /// Deadline for one telnet command to be answered
    pub const COMMAND_TIMEOUT_MS: u64 = 5000;

    /// Coalescing delay applied to inbound telnet data before framing
    pub const SETTLE_DELAY_MS: u64 = 500;

    /// Initial delay before reconnecting a dropped telnet session
    pub const RECONNECT_DELAY_MS: u64 = 1000;

    /// Upper bound for the reconnect backoff
    pub const MAX_RECONNECT_DELAY_MS: u64 = 30000;
}
