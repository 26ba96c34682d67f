//! Device command routing
//!
//! This module handles:
//! - Resolving a request's device and command against the registries
//! - Whitelist validation of request bodies before any I/O
//! - Dispatching to the handler registered for the device type
//! - Composite operations (monitor status snapshot, source/target bind)

mod handlers;
mod router;
mod sources;

#[cfg(test)]
mod fakes;

pub use router::{DeviceRouter, Reply, Request};
