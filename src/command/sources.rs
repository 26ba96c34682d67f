//! Display input source catalog
//!
//! Fixed two-way mapping between the symbolic names used in configuration and
//! requests and the input codes of the display protocol.

use serde::Serialize;

const SOURCES: &[(&str, u8)] = &[
    ("s-video", 0x04),
    ("component", 0x08),
    ("av", 0x0C),
    ("pc", 0x14),
    ("dvi", 0x18),
    ("dvi-video", 0x1F),
    ("magicinfo", 0x20),
    ("hdmi1", 0x21),
    ("hdmi1-pc", 0x22),
    ("hdmi2", 0x23),
    ("hdmi2-pc", 0x24),
    ("displayport", 0x25),
    ("displayport2", 0x26),
    ("displayport3", 0x27),
    ("hdmi3", 0x31),
    ("hdmi3-pc", 0x32),
    ("hdmi4", 0x33),
    ("hdmi4-pc", 0x34),
    ("tv", 0x40),
    ("hdbaset", 0x55),
    ("internal-usb", 0x60),
    ("url-launcher", 0x63),
];

/// A source as reported back to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Source {
    /// Code found in the catalog
    Named(&'static str),
    /// Code the catalog does not know, passed through unchanged
    Raw(u8),
}

/// Protocol code for a symbolic source name
pub fn code_for(name: &str) -> Option<u8> {
    SOURCES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, code)| *code)
}

/// Symbolic name for a protocol code
pub fn name_for(code: u8) -> Source {
    SOURCES
        .iter()
        .find(|(_, known)| *known == code)
        .map(|(name, _)| Source::Named(name))
        .unwrap_or(Source::Raw(code))
}
