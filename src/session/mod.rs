//! Matrix switch session
//!
//! This module handles:
//! - The single persistent telnet connection to the switch
//! - Fire-and-forget login and banner detection
//! - Strictly serialized command dispatch with per-command deadlines
//! - Reconnection with backoff after a drop
//! - The typed switch operations (read state, read port, bind)

mod connection;
mod matrix;

pub use connection::LinkStatus;
pub use matrix::{MatrixSession, SessionSettings};

use crate::error::GatewayResult;
use async_trait::async_trait;
use vidwall_shared::MatrixState;

/// Typed operations on the matrix switch
#[async_trait]
pub trait MatrixControl: Send + Sync {
    /// Input index per output slot (`-1` when unbound)
    async fn read_state(&self) -> GatewayResult<MatrixState>;

    /// Input feeding the given output port, or `-1`
    async fn read_out(&self, output: u8) -> GatewayResult<i32>;

    /// Output fed by the given input port, or `-1`
    async fn read_in(&self, input: u8) -> GatewayResult<i32>;

    /// Connect an input port to an output port
    async fn set(&self, input: u8, output: u8) -> GatewayResult<bool>;
}
