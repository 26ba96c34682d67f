//! Telnet line framing for the matrix switch
//!
//! The switch answers every command with:
//! ```text
//! <command echo>\r\n
//! <payload line>\r\n
//! ...
//! >
//! ```
//! A response ends at the first line that starts with the prompt `"> "`.
//! Responses may arrive in several TCP chunks, and a late answer may share a
//! chunk with the next one.

use bytes::BytesMut;
use thiserror::Error;

/// Prompt that closes every response
pub const TERMINATOR: &str = "> ";

/// Line separator in both directions
pub const LINE_END: &str = "\r\n";

/// Maximum buffered response size (64 KB); a full `read` is well under 1 KB
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Errors raised while buffering switch output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramerError {
    #[error("Response too large: {0} bytes without a prompt (max: {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge(usize),
}

/// Wire text for one command
pub fn command_line(command: &str) -> String {
    format!("{command}{LINE_END}")
}

/// Wire text for the login exchange
///
/// The switch asks for username and password in turn but never shows the
/// prompt in between, so both lines are written at once.
pub fn login_lines(username: &str, password: &str) -> String {
    format!("{username}{LINE_END}{password}{LINE_END}")
}

/// Strip the command echo (first line) and the prompt (last line)
pub fn payload_lines(mut lines: Vec<String>) -> Vec<String> {
    if lines.len() < 2 {
        return Vec::new();
    }
    lines.pop();
    lines.remove(0);
    lines
}

/// Accumulates inbound bytes until a full response is buffered
#[derive(Debug, Default)]
pub struct ResponseFramer {
    buffer: BytesMut,
}

impl ResponseFramer {
    /// Create a new response framer
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Add data to the framer buffer
    ///
    /// Fails, leaving the buffer empty, once more than [`MAX_RESPONSE_SIZE`]
    /// bytes are pending without a prompt.
    pub fn extend(&mut self, data: &[u8]) -> Result<(), FramerError> {
        let pending = self.buffer.len() + data.len();
        if pending > MAX_RESPONSE_SIZE {
            self.buffer.clear();
            return Err(FramerError::ResponseTooLarge(pending));
        }

        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Whether at least one full response is buffered
    pub fn is_complete(&self) -> bool {
        self.response_end().is_some()
    }

    /// Take the first buffered response split into lines, if it is complete
    ///
    /// Anything after its prompt stays buffered for the next call.
    pub fn take_response(&mut self) -> Option<Vec<String>> {
        let end = self.response_end()?;

        let raw = self.buffer.split_to(end);
        let text = String::from_utf8_lossy(&raw);
        Some(text.split(LINE_END).map(str::to_owned).collect())
    }

    /// Offset just past the first prompt that starts a line
    fn response_end(&self) -> Option<usize> {
        let prompt = TERMINATOR.as_bytes();
        let end = LINE_END.as_bytes();

        let mut line_start = 0;
        loop {
            let rest = &self.buffer[line_start..];
            if rest.starts_with(prompt) {
                return Some(line_start + prompt.len());
            }
            let line_len = rest.windows(end.len()).position(|w| w == end)?;
            line_start += line_len + end.len();
        }
    }

    /// Drop anything buffered so far
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
