//! In-memory stand-ins for the display link and the matrix session

use crate::config::{CommandRegistry, DeviceRegistry, GatewayConfig};
use crate::error::GatewayResult;
use crate::session::MatrixControl;
use crate::transport::{MonitorLink, MonitorReply};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vidwall_shared::codec::{self, ACK, NAK};
use vidwall_shared::{CodecError, MatrixState, UNBOUND};

const DEVICES: &str = r#"{
    "devices": {
        "wall-1": { "type": "monitor", "id": 1, "ip": "192.168.35.161", "index": 1, "main-source": "hdmi1" },
        "wall-2": { "type": "monitor", "id": 2, "ip": "192.168.35.162", "index": 2, "main-source": "hdmi2" },
        "wall-no-ip": { "type": "monitor", "id": 3 },
        "pc-1": { "type": "client", "index": 1 },
        "pc-2": { "type": "client", "index": 2 },
        "laptop": { "type": "ext-client", "source": "hdmi3" },
        "matrix": { "type": "switch" }
    },
    "commands": {
        "monitor": {
            "power": { "id": "11", "values": [0, 1] },
            "source": { "id": "0x14", "values": ["hdmi1", "hdmi2", "hdmi3", "displayport"] },
            "videowall-toggle": { "id": "84", "values": [0, 1] }
        },
        "switch": {
            "state": { "id": "state" },
            "bind": { "id": "bind" }
        }
    }
}"#;

pub(crate) fn registries() -> (Arc<DeviceRegistry>, Arc<CommandRegistry>) {
    let config = GatewayConfig::from_json(DEVICES).unwrap();
    let (devices, commands) = config.registries();
    (Arc::new(devices), Arc::new(commands))
}

fn reply(marker: u8, command: u8, result: u8) -> MonitorReply {
    let frame = codec::encode_frame(0x01, 0xFF, &[marker, command, result]).unwrap();
    MonitorReply::Response(frame)
}

pub(crate) fn ack(command: u8, result: u8) -> MonitorReply {
    reply(ACK, command, result)
}

pub(crate) fn nak(command: u8, code: u8) -> MonitorReply {
    reply(NAK, command, code)
}

/// Device traffic in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Monitor(u8, Vec<u8>),
    Read,
    Set(u8, u8),
}

pub(crate) type EventLog = Arc<Mutex<Vec<Event>>>;

/// `(ip, device id, command, values)`
pub(crate) type Call = (String, u8, u8, Vec<u8>);

/// Display link answering from a fixed function of command and values
pub(crate) struct FakeMonitor {
    respond: fn(u8, &[u8]) -> MonitorReply,
    calls: Mutex<Vec<Call>>,
    log: EventLog,
}

impl FakeMonitor {
    pub fn new(respond: fn(u8, &[u8]) -> MonitorReply) -> Arc<Self> {
        Arc::new(Self {
            respond,
            calls: Mutex::new(Vec::new()),
            log: EventLog::default(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitorLink for FakeMonitor {
    async fn execute(
        &self,
        ip: &str,
        device_id: u8,
        command: u8,
        values: &[u8],
    ) -> Result<MonitorReply, CodecError> {
        self.calls
            .lock()
            .unwrap()
            .push((ip.to_string(), device_id, command, values.to_vec()));
        self.log
            .lock()
            .unwrap()
            .push(Event::Monitor(command, values.to_vec()));
        Ok((self.respond)(command, values))
    }
}

/// Matrix holding a fixed routing table
pub(crate) struct FakeMatrix {
    state: MatrixState,
    accept: bool,
    reads: AtomicUsize,
    sets: Mutex<Vec<(u8, u8)>>,
    log: EventLog,
}

impl FakeMatrix {
    pub fn new(state: MatrixState) -> Arc<Self> {
        Self::build(state, true, EventLog::default())
    }

    /// Shares the event log of a display fake to check cross-device order
    pub fn with_log(state: MatrixState, log: EventLog) -> Arc<Self> {
        Self::build(state, true, log)
    }

    /// Answers every `set` with something other than "Switch input"
    pub fn refusing(state: MatrixState) -> Arc<Self> {
        Self::build(state, false, EventLog::default())
    }

    fn build(state: MatrixState, accept: bool, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            state,
            accept,
            reads: AtomicUsize::new(0),
            sets: Mutex::new(Vec::new()),
            log,
        })
    }

    /// Number of read operations of any kind
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> Vec<(u8, u8)> {
        self.sets.lock().unwrap().clone()
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Event::Read);
    }
}

#[async_trait]
impl MatrixControl for FakeMatrix {
    async fn read_state(&self) -> GatewayResult<MatrixState> {
        self.record_read();
        Ok(self.state)
    }

    async fn read_out(&self, output: u8) -> GatewayResult<i32> {
        self.record_read();
        let slot = usize::from(output).wrapping_sub(1);
        Ok(self.state.get(slot).copied().unwrap_or(UNBOUND))
    }

    async fn read_in(&self, input: u8) -> GatewayResult<i32> {
        self.record_read();
        Ok(self
            .state
            .iter()
            .position(|bound| *bound == i32::from(input))
            .map(|slot| slot as i32 + 1)
            .unwrap_or(UNBOUND))
    }

    async fn set(&self, input: u8, output: u8) -> GatewayResult<bool> {
        self.sets.lock().unwrap().push((input, output));
        self.log.lock().unwrap().push(Event::Set(input, output));
        Ok(self.accept)
    }
}
