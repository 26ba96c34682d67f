//! Gateway error taxonomy and its HTTP-facing form

use serde::Serialize;
use thiserror::Error;
use vidwall_shared::{CodecError, ParseError};

/// Every way a device request can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Unknown device or command, or a body outside the whitelist
    #[error("{0}")]
    Validation(String),

    /// A descriptor lacks a field the operation needs
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No answer within the deadline (or the display socket failed)
    #[error("Timeout: {0}")]
    TransportTimeout(String),

    /// The switch connection is down or dropped mid-command
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A response did not have the expected shape
    #[error("Unexpected response: {0}")]
    ProtocolParse(String),

    /// The display answered without ACK
    #[error("Device rejected command 0x{command:02X}: ERR_{code}")]
    DeviceNak { command: u8, code: u8 },

    /// The switch refused a connection change
    #[error("Switch refused to connect input {input} to output {output}")]
    SwitchRejected { input: u8, output: u8 },
}

/// Error record handed to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedError {
    pub status: u16,
    pub message: String,
}

impl GatewayError {
    /// HTTP status the error translates to
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 405,
            GatewayError::Configuration(_) => 500,
            GatewayError::TransportTimeout(_) => 504,
            GatewayError::TransportFailure(_)
            | GatewayError::ProtocolParse(_)
            | GatewayError::DeviceNak { .. }
            | GatewayError::SwitchRejected { .. } => 502,
        }
    }

    /// Status and message in one record
    pub fn tagged(&self) -> TaggedError {
        TaggedError {
            status: self.status(),
            message: self.to_string(),
        }
    }
}

impl From<ParseError> for GatewayError {
    fn from(e: ParseError) -> Self {
        GatewayError::ProtocolParse(e.to_string())
    }
}

impl From<CodecError> for GatewayError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::TooManyValues(_) => GatewayError::Validation(e.to_string()),
            _ => GatewayError::ProtocolParse(e.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
