//! Telnet Session State Machine
//!
//! Defines how the matrix switch session reacts to connection events, queued
//! commands, completed responses and command timeouts. The machine performs
//! no I/O: every transition returns the actions the owner must carry out.
//!
//! ```text
//! Disconnected -> Authenticating -> Idle <-> AwaitingResponse
//! ```
//! At most one command is in flight; queued commands leave in FIFO order. A
//! response is credited to the in-flight command only when its first line
//! echoes that command, so a late answer to a timed-out command cannot be
//! handed to the next caller. Login has the same deadline as a command.

use std::collections::VecDeque;

use crate::telnet::{command_line, login_lines, payload_lines};

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection to the switch
    Disconnected,
    /// Credentials sent, waiting for the login banner to finish
    Authenticating,
    /// Logged in, nothing in flight
    Idle,
    /// One command written, waiting for its prompt
    AwaitingResponse,
}

/// Why a queued command did not get an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// The command was not answered within the deadline
    Timeout,
    /// The login banner did not finish within the deadline
    LoginTimeout,
    /// The connection dropped while the command was queued or in flight
    ConnectionLost,
    /// The command arrived while no connection was up
    NotConnected,
}

/// Events that drive the session
#[derive(Debug)]
pub enum SessionEvent<T> {
    /// The TCP connection was established
    Connected,
    /// The TCP connection was closed or failed
    Disconnected,
    /// A caller queued a command
    Enqueue { command: String, token: T },
    /// A complete response (raw lines, prompt included) was framed
    Response(Vec<String>),
    /// The deadline of the login or of the in-flight command expired
    Timeout,
}

/// Side effects requested by a transition
#[derive(Debug, PartialEq, Eq)]
pub enum SessionAction<T> {
    /// Write this text to the switch
    Write(String),
    /// Start the deadline for the login or the command just written
    ArmTimeout,
    /// Cancel the running deadline
    DisarmTimeout,
    /// Drop any partially buffered response
    ResetFramer,
    /// The login banner was consumed
    LoggedIn,
    /// Deliver the payload lines of a response to its caller
    Complete {
        token: T,
        command: String,
        lines: Vec<String>,
    },
    /// Fail a queued or in-flight command
    Fail {
        token: T,
        command: String,
        reason: FailReason,
    },
    /// A response arrived that no command was waiting for
    Unsolicited(Vec<String>),
    /// Give up on the connection; the owner reconnects
    Close,
}

#[derive(Debug)]
struct PendingCommand<T> {
    command: String,
    token: T,
}

#[derive(Debug)]
enum Phase<T> {
    Disconnected,
    Authenticating,
    Idle,
    Awaiting(PendingCommand<T>),
}

/// The serialized command queue of one switch session
#[derive(Debug)]
pub struct SessionStateMachine<T> {
    phase: Phase<T>,
    queue: VecDeque<PendingCommand<T>>,
    username: String,
    password: String,
}

impl<T> SessionStateMachine<T> {
    /// Create a new state machine in Disconnected state
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phase: Phase::Disconnected,
            queue: VecDeque::new(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Disconnected => SessionState::Disconnected,
            Phase::Authenticating => SessionState::Authenticating,
            Phase::Idle => SessionState::Idle,
            Phase::Awaiting(_) => SessionState::AwaitingResponse,
        }
    }

    /// Number of commands waiting behind the in-flight one
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Text of the in-flight command, if any
    pub fn in_flight(&self) -> Option<&str> {
        match &self.phase {
            Phase::Awaiting(pending) => Some(&pending.command),
            _ => None,
        }
    }

    /// Process an event and return the actions to perform, in order
    pub fn process_event(&mut self, event: SessionEvent<T>) -> Vec<SessionAction<T>> {
        let mut actions = Vec::new();

        match event {
            SessionEvent::Connected => {
                // A reconnect without a prior drop still fails what was in flight
                self.fail_all(FailReason::ConnectionLost, &mut actions);
                actions.push(SessionAction::ResetFramer);
                actions.push(SessionAction::Write(login_lines(
                    &self.username,
                    &self.password,
                )));
                actions.push(SessionAction::ArmTimeout);
                self.phase = Phase::Authenticating;
            }
            SessionEvent::Disconnected => {
                self.fail_all(FailReason::ConnectionLost, &mut actions);
                actions.push(SessionAction::ResetFramer);
                self.phase = Phase::Disconnected;
            }
            SessionEvent::Enqueue { command, token } => {
                if matches!(self.phase, Phase::Disconnected) {
                    actions.push(SessionAction::Fail {
                        token,
                        command,
                        reason: FailReason::NotConnected,
                    });
                } else {
                    self.queue.push_back(PendingCommand { command, token });
                    if matches!(self.phase, Phase::Idle) {
                        self.dispatch_next(&mut actions);
                    }
                }
            }
            SessionEvent::Response(lines) => {
                match std::mem::replace(&mut self.phase, Phase::Idle) {
                    Phase::Authenticating => {
                        actions.push(SessionAction::DisarmTimeout);
                        actions.push(SessionAction::LoggedIn);
                        self.dispatch_next(&mut actions);
                    }
                    Phase::Awaiting(pending) if !echoes(&lines, &pending.command) => {
                        // Keep waiting, the deadline stays armed
                        self.phase = Phase::Awaiting(pending);
                        actions.push(SessionAction::Unsolicited(lines));
                    }
                    Phase::Awaiting(pending) => {
                        actions.push(SessionAction::DisarmTimeout);
                        actions.push(SessionAction::Complete {
                            token: pending.token,
                            command: pending.command,
                            lines: payload_lines(lines),
                        });
                        self.dispatch_next(&mut actions);
                    }
                    phase @ (Phase::Idle | Phase::Disconnected) => {
                        self.phase = phase;
                        actions.push(SessionAction::Unsolicited(lines));
                    }
                }
            }
            SessionEvent::Timeout => match std::mem::replace(&mut self.phase, Phase::Idle) {
                Phase::Authenticating => {
                    self.fail_all(FailReason::LoginTimeout, &mut actions);
                    actions.push(SessionAction::ResetFramer);
                    actions.push(SessionAction::Close);
                    self.phase = Phase::Disconnected;
                }
                Phase::Awaiting(pending) => {
                    actions.push(SessionAction::ResetFramer);
                    actions.push(SessionAction::Fail {
                        token: pending.token,
                        command: pending.command,
                        reason: FailReason::Timeout,
                    });
                    self.dispatch_next(&mut actions);
                }
                // A deadline outside login or AwaitingResponse is stale
                phase @ (Phase::Idle | Phase::Disconnected) => {
                    self.phase = phase;
                }
            },
        }

        actions
    }

    /// Pop the queue head and put it on the wire
    fn dispatch_next(&mut self, actions: &mut Vec<SessionAction<T>>) {
        if let Some(next) = self.queue.pop_front() {
            actions.push(SessionAction::Write(command_line(&next.command)));
            actions.push(SessionAction::ArmTimeout);
            self.phase = Phase::Awaiting(next);
        } else {
            self.phase = Phase::Idle;
        }
    }

    fn fail_all(&mut self, reason: FailReason, actions: &mut Vec<SessionAction<T>>) {
        if let Phase::Awaiting(pending) = std::mem::replace(&mut self.phase, Phase::Disconnected) {
            actions.push(SessionAction::DisarmTimeout);
            actions.push(SessionAction::Fail {
                token: pending.token,
                command: pending.command,
                reason,
            });
        }

        for pending in self.queue.drain(..) {
            actions.push(SessionAction::Fail {
                token: pending.token,
                command: pending.command,
                reason,
            });
        }
    }
}

/// Whether the first line of a response is the echo of `command`
fn echoes(lines: &[String], command: &str) -> bool {
    lines
        .first()
        .is_some_and(|echo| echo.trim() == command.trim())
}
