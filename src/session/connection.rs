//! Session actor owning the telnet connection

use super::matrix::{SessionRequest, SessionSettings};
use crate::error::GatewayError;
use crate::transport::TransportConnector;
use anyhow::{anyhow, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};
use vidwall_shared::{
    FailReason, ResponseFramer, SessionAction, SessionEvent, SessionStateMachine,
};

/// Where a command's answer is delivered
pub(super) type Reply = oneshot::Sender<Result<Vec<String>, GatewayError>>;

type Machine = SessionStateMachine<Reply>;

/// Connection status published by the actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// First connection attempt still running
    Connecting,
    /// Connected (login may still be in progress)
    Up,
    /// Not connected, waiting to retry
    Down,
}

/// Main connection loop with reconnection logic
pub(super) async fn connection_loop<C: TransportConnector>(
    connector: C,
    settings: SessionSettings,
    mut request_rx: mpsc::UnboundedReceiver<SessionRequest>,
    status_tx: watch::Sender<LinkStatus>,
) {
    let mut fsm: Machine = SessionStateMachine::new(&settings.username, &settings.password);
    let mut reconnect_delay = settings.reconnect_delay;

    loop {
        match connector.connect().await {
            Ok(stream) => {
                info!("[TELNET] Connected to {}", connector.name());
                reconnect_delay = settings.reconnect_delay;
                let _ = status_tx.send(LinkStatus::Up);

                match handle_connection(stream, &settings, &mut fsm, &mut request_rx).await {
                    Ok(()) => {
                        info!("[TELNET] All session handles dropped, closing");
                        return;
                    }
                    Err(e) => {
                        warn!("[TELNET] Connection closed: {:#}", e);
                    }
                }

                for action in fsm.process_event(SessionEvent::Disconnected) {
                    deliver(action);
                }
                let _ = status_tx.send(LinkStatus::Down);
            }
            Err(e) => {
                warn!("[TELNET] Failed to connect to {}: {:#}", connector.name(), e);
                let _ = status_tx.send(LinkStatus::Down);
            }
        }

        // Wait before reconnecting; anything asked meanwhile fails right away
        let backoff = sleep(reconnect_delay);
        tokio::pin!(backoff);
        loop {
            tokio::select! {
                _ = &mut backoff => break,
                request = request_rx.recv() => match request {
                    Some(request) => {
                        let event = SessionEvent::Enqueue {
                            command: request.command,
                            token: request.reply,
                        };
                        for action in fsm.process_event(event) {
                            deliver(action);
                        }
                    }
                    None => return,
                },
            }
        }

        reconnect_delay = std::cmp::min(reconnect_delay * 2, settings.max_reconnect_delay);
    }
}

/// Handle an active connection
///
/// Returns `Ok(())` once every session handle is gone, `Err` when the
/// connection fails.
async fn handle_connection<S>(
    stream: S,
    settings: &SessionSettings,
    fsm: &mut Machine,
    request_rx: &mut mpsc::UnboundedReceiver<SessionRequest>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let mut link = Link {
        writer,
        framer: ResponseFramer::new(),
        command_deadline: None,
        command_timeout: settings.command_timeout,
    };
    let mut read_buf = vec![0u8; 4096];
    let mut settle_deadline: Option<Instant> = None;

    link.perform(fsm.process_event(SessionEvent::Connected)).await?;

    loop {
        tokio::select! {
            request = request_rx.recv() => {
                let Some(request) = request else {
                    return Ok(());
                };
                debug!("[TELNET] Enqueued '{}'", request.command);
                let event = SessionEvent::Enqueue {
                    command: request.command,
                    token: request.reply,
                };
                link.perform(fsm.process_event(event)).await?;
            }

            read = reader.read(&mut read_buf) => {
                match read {
                    Ok(0) => return Err(anyhow!("switch closed the connection")),
                    Ok(n) => {
                        link.framer.extend(&read_buf[..n])?;
                        // Let multi-chunk answers settle before framing
                        settle_deadline = Some(Instant::now() + settings.settle_delay);
                    }
                    Err(e) => return Err(anyhow!("read error: {}", e)),
                }
            }

            _ = wait_for(settle_deadline) => {
                settle_deadline = None;
                while let Some(lines) = link.framer.take_response() {
                    link.perform(fsm.process_event(SessionEvent::Response(lines))).await?;
                }
                if link.framer.buffer_len() > 0 {
                    debug!(
                        "[TELNET] Partial response ({} bytes), waiting for more",
                        link.framer.buffer_len()
                    );
                }
            }

            _ = wait_for(link.command_deadline) => {
                link.command_deadline = None;
                match fsm.in_flight() {
                    Some(command) => warn!(
                        "[TELNET] Timeout for command '{}' after {}ms",
                        command,
                        settings.command_timeout.as_millis()
                    ),
                    None => warn!(
                        "[TELNET] No login prompt after {}ms",
                        settings.command_timeout.as_millis()
                    ),
                }
                link.perform(fsm.process_event(SessionEvent::Timeout)).await?;
            }
        }
    }
}

/// Sleep until the deadline, or forever when there is none
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Write half of the connection plus the per-connection framing state
struct Link<W> {
    writer: W,
    framer: ResponseFramer,
    command_deadline: Option<Instant>,
    command_timeout: std::time::Duration,
}

impl<W: AsyncWrite + Unpin> Link<W> {
    /// Carry out the actions of one transition, in order
    async fn perform(&mut self, actions: Vec<SessionAction<Reply>>) -> Result<()> {
        for action in actions {
            match action {
                SessionAction::Write(text) => {
                    debug!("[TELNET] $ {}", text.trim_end());
                    self.writer.write_all(text.as_bytes()).await?;
                    self.writer.flush().await?;
                }
                SessionAction::ArmTimeout => {
                    self.command_deadline = Some(Instant::now() + self.command_timeout);
                }
                SessionAction::DisarmTimeout => {
                    self.command_deadline = None;
                }
                SessionAction::ResetFramer => {
                    self.framer.clear();
                }
                SessionAction::Close => {
                    return Err(anyhow!("switch login did not complete"));
                }
                other => deliver(other),
            }
        }
        Ok(())
    }
}

/// Handle the actions that need no connection
fn deliver(action: SessionAction<Reply>) {
    match action {
        SessionAction::Complete {
            token,
            command,
            lines,
        } => {
            debug!("[TELNET] '{}' answered with {} lines", command, lines.len());
            if token.send(Ok(lines)).is_err() {
                debug!("[TELNET] Caller of '{}' went away", command);
            }
        }
        SessionAction::Fail {
            token,
            command,
            reason,
        } => {
            let _ = token.send(Err(failure(&command, reason)));
        }
        SessionAction::LoggedIn => {
            info!("[TELNET] Logged in");
        }
        SessionAction::Unsolicited(lines) => {
            debug!("[TELNET] Dropping unsolicited response: {:?}", lines);
        }
        SessionAction::Write(_)
        | SessionAction::ArmTimeout
        | SessionAction::DisarmTimeout
        | SessionAction::ResetFramer
        | SessionAction::Close => {}
    }
}

fn failure(command: &str, reason: FailReason) -> GatewayError {
    match reason {
        FailReason::Timeout => {
            GatewayError::TransportTimeout(format!("switch did not answer '{command}'"))
        }
        FailReason::LoginTimeout => GatewayError::TransportTimeout(format!(
            "switch login did not complete before '{command}'"
        )),
        FailReason::ConnectionLost => GatewayError::TransportFailure(format!(
            "connection to the switch lost during '{command}'"
        )),
        FailReason::NotConnected => {
            GatewayError::TransportFailure("switch is not connected".into())
        }
    }
}
