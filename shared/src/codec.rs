//! Binary display-control framing
//!
//! Every request and reply exchanged with a display is framed as:
//! ```text
//! [ 0xAA ][ command ][ device id ][ value count ][ values... ][ checksum ]
//! ```
//!
//! The checksum is the byte sum of everything after the header marker,
//! wrapping at 8 bits. Replies reuse the layout with command `0xFF` and carry
//! the ack marker, the echoed command and the result in bytes 4, 5 and 6.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// First byte of every frame
pub const FRAME_HEADER: u8 = 0xAA;

/// Ack marker ('A') found at byte 4 of a positive reply
pub const ACK: u8 = 0x41;

/// Nak marker ('N') found at byte 4 of a negative reply
pub const NAK: u8 = 0x4E;

/// A frame carries its value count in one byte
pub const MAX_VALUES: usize = u8::MAX as usize;

/// Shortest reply that still carries ack, command and result
pub const MIN_REPLY_LEN: usize = 7;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Too many values: {0} (max: {MAX_VALUES})")]
    TooManyValues(usize),

    #[error("Invalid frame header: 0x{0:02X}")]
    InvalidHeader(u8),

    #[error("Not enough data: need {needed} bytes, have {available}")]
    NotEnoughData { needed: usize, available: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// A decoded display frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorFrame {
    pub command: u8,
    pub device_id: u8,
    pub values: Vec<u8>,
}

/// Ack/result pair extracted from a display reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckReply {
    pub ack: bool,
    pub command: u8,
    pub result: u8,
}

/// Compute the additive frame checksum
pub fn checksum(device_id: u8, command: u8, values: &[u8]) -> u8 {
    values.iter().fold(
        device_id
            .wrapping_add(values.len() as u8)
            .wrapping_add(command),
        |sum, v| sum.wrapping_add(*v),
    )
}

/// Encode a request frame for the given display
pub fn encode_frame(device_id: u8, command: u8, values: &[u8]) -> Result<Bytes, CodecError> {
    if values.len() > MAX_VALUES {
        return Err(CodecError::TooManyValues(values.len()));
    }

    let mut buf = BytesMut::with_capacity(5 + values.len());
    buf.put_u8(FRAME_HEADER);
    buf.put_u8(command);
    buf.put_u8(device_id);
    buf.put_u8(values.len() as u8);
    buf.put_slice(values);
    buf.put_u8(checksum(device_id, command, values));

    Ok(buf.freeze())
}

/// Decode and verify one complete frame
///
/// Trailing bytes after the checksum are ignored.
pub fn decode_frame(data: &[u8]) -> Result<MonitorFrame, CodecError> {
    if data.len() < 5 {
        return Err(CodecError::NotEnoughData {
            needed: 5,
            available: data.len(),
        });
    }

    if data[0] != FRAME_HEADER {
        return Err(CodecError::InvalidHeader(data[0]));
    }

    let count = data[3] as usize;
    let total = 5 + count;
    if data.len() < total {
        return Err(CodecError::NotEnoughData {
            needed: total,
            available: data.len(),
        });
    }

    let command = data[1];
    let device_id = data[2];
    let values = data[4..4 + count].to_vec();

    let expected = checksum(device_id, command, &values);
    let actual = data[total - 1];
    if expected != actual {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    Ok(MonitorFrame {
        command,
        device_id,
        values,
    })
}

/// Extract ack flag and result from a reply
///
/// Offsets are fixed by the protocol; the checksum is not verified here.
pub fn decode_ack(response: &[u8]) -> Result<AckReply, CodecError> {
    if response.len() < MIN_REPLY_LEN {
        return Err(CodecError::NotEnoughData {
            needed: MIN_REPLY_LEN,
            available: response.len(),
        });
    }

    if response[0] != FRAME_HEADER {
        return Err(CodecError::InvalidHeader(response[0]));
    }

    Ok(AckReply {
        ack: response[4] == ACK,
        command: response[5],
        result: response[6],
    })
}
