//! Matrix switch commands and response parsers
//!
//! Each parser takes the payload lines of one response (echo and prompt
//! already stripped) and accepts exactly the shapes documented on it.
//! Port numbers on the wire are 1-based and always two digits.

use thiserror::Error;

/// Number of output ports reported by `read`
pub const MATRIX_OUTPUTS: usize = 8;

/// Port value for "nothing connected"
pub const UNBOUND: i32 = -1;

/// Input index per output slot: `state[output - 1] = input`
pub type MatrixState = [i32; MATRIX_OUTPUTS];

const READ_OK: &str = "read Command OK";
const NO_INPUT_ON_OUTPUT: &str = "No port is connected to Output Port";
const NO_OUTPUT_ON_INPUT: &str = "No port is connected to Input Port";
const SWITCH_OK: &str = "Switch input";

/// Errors raised when a response does not have the expected shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty response")]
    EmptyResponse,

    #[error("Unexpected response: '{0}'")]
    UnexpectedResponse(String),
}

/// Command reading the full connection table
pub fn read_state_command() -> String {
    "read".to_string()
}

/// Command asking which input feeds an output port
pub fn read_out_command(output: u8) -> String {
    format!("ro {output:02}")
}

/// Command asking which output an input port feeds
pub fn read_in_command(input: u8) -> String {
    format!("ri {input:02}")
}

/// Command connecting an input port to an output port
pub fn set_command(input: u8, output: u8) -> String {
    format!("ss {input:02},{output:02}")
}

fn first_line(lines: &[String]) -> Result<&str, ParseError> {
    lines
        .first()
        .map(|l| l.trim_end_matches('\r'))
        .ok_or(ParseError::EmptyResponse)
}

/// Parse the answer to `read`
///
/// ```text
/// read Command OK
/// o01 i02 video on audio on
/// ... (one line per output, o01 through o08)
/// ```
/// Lines that do not match yield [`UNBOUND`] for their slot; missing lines
/// leave their slot unbound as well.
pub fn parse_state(lines: &[String]) -> Result<MatrixState, ParseError> {
    let header = first_line(lines)?;
    if !header.starts_with(READ_OK) {
        return Err(ParseError::UnexpectedResponse(header.to_string()));
    }

    let mut state = [UNBOUND; MATRIX_OUTPUTS];
    for (slot, line) in lines.iter().skip(1).take(MATRIX_OUTPUTS).enumerate() {
        state[slot] = parse_state_line(line).unwrap_or(UNBOUND);
    }

    Ok(state)
}

/// Parse one `o{NN} i{MM} video on audio on` line into the input index
fn parse_state_line(line: &str) -> Option<i32> {
    let mut tokens = line.split_whitespace();

    let output = tokens.next()?.strip_prefix('o')?;
    let input = tokens.next()?.strip_prefix('i')?;

    parse_port(output)?;
    parse_port(input)
}

/// Parse the answer to `ro NN`
///
/// `Input Port II is connected to Output Port NN ` yields `II`;
/// `No port is connected to Output Port NN` yields [`UNBOUND`].
pub fn parse_read_out(lines: &[String]) -> Result<i32, ParseError> {
    let line = first_line(lines)?;
    if line.starts_with(NO_INPUT_ON_OUTPUT) {
        return Ok(UNBOUND);
    }

    Ok(parse_connection(line, "Input Port ", " is connected to Output Port ")
        .map(|(input, _)| input)
        .unwrap_or(UNBOUND))
}

/// Parse the answer to `ri NN`
///
/// `Output Port OO is connected to Input Port NN ` yields `OO`;
/// `No port is connected to Input Port NN` yields [`UNBOUND`].
pub fn parse_read_in(lines: &[String]) -> Result<i32, ParseError> {
    let line = first_line(lines)?;
    if line.starts_with(NO_OUTPUT_ON_INPUT) {
        return Ok(UNBOUND);
    }

    Ok(parse_connection(line, "Output Port ", " is connected to Input Port ")
        .map(|(output, _)| output)
        .unwrap_or(UNBOUND))
}

/// Parse the answer to `ss II,OO`: success iff it starts with `Switch input`
pub fn parse_switch(lines: &[String]) -> Result<bool, ParseError> {
    Ok(first_line(lines)?.starts_with(SWITCH_OK))
}

/// Split `<lead>AA<middle>BB` into its two port numbers
fn parse_connection(line: &str, lead: &str, middle: &str) -> Option<(i32, i32)> {
    let start = line.find(lead)? + lead.len();
    let (first, second) = line[start..].split_once(middle)?;

    Some((parse_port(first)?, parse_port(second.trim_end())?))
}

/// Two ASCII digits
fn parse_port(text: &str) -> Option<i32> {
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
