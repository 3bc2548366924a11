// SPDX-License-Identifier: MIT OR Apache-2.0
//! Header parser for vendor binary sequence files (`PSEQ`).
//!
//! Layout of the fixed 24-byte header (all integers little-endian):
//!
//! | Offset | Size | Field                 |
//! |--------|------|-----------------------|
//! | 0      | 4    | magic, ASCII `PSEQ`   |
//! | 6      | 1    | minor version         |
//! | 7      | 1    | major version         |
//! | 12     | 4    | channel count         |
//! | 16     | 4    | frame count           |
//! | 20     | 1    | step time (ms)        |
//!
//! Only the header is validated. Channel data past the header is never read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// File magic
pub const MAGIC: &[u8; 4] = b"PSEQ";

/// Minimum file size: the fixed header
pub const HEADER_SIZE: usize = 24;

/// The only major version this parser understands
pub const SUPPORTED_MAJOR_VERSION: u8 = 2;

const MINOR_VERSION_OFFSET: usize = 6;
const MAJOR_VERSION_OFFSET: usize = 7;
const CHANNEL_COUNT_OFFSET: usize = 12;
const FRAME_COUNT_OFFSET: usize = 16;
const STEP_TIME_OFFSET: usize = 20;

/// Errors produced while validating a binary sequence header
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Buffer shorter than the fixed header
    #[error("file too small: {len} bytes, header needs {HEADER_SIZE}")]
    TooSmall {
        /// Actual buffer length
        len: usize,
    },

    /// First four bytes are not `PSEQ`
    #[error("bad magic {found:?}, expected \"PSEQ\"")]
    BadMagic {
        /// The four bytes read, lossily decoded as text
        found: String,
    },

    /// Major version other than 2
    #[error("unsupported version {version}")]
    UnsupportedVersion {
        /// Version as "major.minor"
        version: String,
    },

    /// Channel count field is zero
    #[error("invalid channel count: 0")]
    InvalidChannelCount,

    /// Frame count field is zero
    #[error("invalid frame count: 0")]
    InvalidFrameCount,

    /// Step time field is zero
    #[error("invalid step time: 0 ms")]
    InvalidStepTime,
}

/// Format version stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Facts derived from a validated header.
///
/// Computed once by [`parse_binary_sequence`]; fields are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryMetadata {
    version: FormatVersion,
    frame_count: u32,
    channel_count: u32,
    step_time_ms: u8,
    frame_rate: u32,
    duration_secs: u32,
    file_size: u64,
}

impl BinaryMetadata {
    /// Format version
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Total number of frames
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Channels per frame
    pub fn channel_count(&self) -> u32 {
        self.channel_count
    }

    /// Time between frames in milliseconds
    pub fn step_time_ms(&self) -> u8 {
        self.step_time_ms
    }

    /// Frames per second, rounded to nearest
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Total duration in whole seconds, rounded to nearest
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Size of the parsed file in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

/// Validate a binary sequence header and derive its metadata.
///
/// Checks run in a fixed order and stop at the first failure, so a buffer
/// with several defects always reports the earliest one.
pub fn parse_binary_sequence(bytes: &[u8]) -> Result<BinaryMetadata, ParseError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ParseError::TooSmall { len: bytes.len() });
    }

    let magic = &bytes[0..4];
    if magic != MAGIC {
        return Err(ParseError::BadMagic {
            found: String::from_utf8_lossy(magic).into_owned(),
        });
    }

    let version = FormatVersion {
        major: bytes[MAJOR_VERSION_OFFSET],
        minor: bytes[MINOR_VERSION_OFFSET],
    };
    if version.major != SUPPORTED_MAJOR_VERSION {
        return Err(ParseError::UnsupportedVersion {
            version: version.to_string(),
        });
    }

    let channel_count = read_u32_le(bytes, CHANNEL_COUNT_OFFSET);
    if channel_count == 0 {
        return Err(ParseError::InvalidChannelCount);
    }

    let frame_count = read_u32_le(bytes, FRAME_COUNT_OFFSET);
    if frame_count == 0 {
        return Err(ParseError::InvalidFrameCount);
    }

    let step_time_ms = bytes[STEP_TIME_OFFSET];
    if step_time_ms == 0 {
        return Err(ParseError::InvalidStepTime);
    }

    Ok(BinaryMetadata {
        version,
        frame_count,
        channel_count,
        step_time_ms,
        frame_rate: frame_rate(step_time_ms),
        duration_secs: duration_secs(frame_count, step_time_ms),
        file_size: bytes.len() as u64,
    })
}

/// Write a minimal valid header for the given layout.
///
/// Useful for producing fixture files; the result parses back to the same
/// channel count, frame count and step time.
pub fn encode_header(channel_count: u32, frame_count: u32, step_time_ms: u8) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(MAGIC);
    header[MINOR_VERSION_OFFSET] = 0;
    header[MAJOR_VERSION_OFFSET] = SUPPORTED_MAJOR_VERSION;
    header[CHANNEL_COUNT_OFFSET..CHANNEL_COUNT_OFFSET + 4].copy_from_slice(&channel_count.to_le_bytes());
    header[FRAME_COUNT_OFFSET..FRAME_COUNT_OFFSET + 4].copy_from_slice(&frame_count.to_le_bytes());
    header[STEP_TIME_OFFSET] = step_time_ms;
    header
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// `round(1000 / step_time_ms)`, half away from zero
fn frame_rate(step_time_ms: u8) -> u32 {
    let step = u32::from(step_time_ms);
    (2 * 1000 + step) / (2 * step)
}

/// `round(frame_count * step_time_ms / 1000)`, half away from zero
fn duration_secs(frame_count: u32, step_time_ms: u8) -> u32 {
    let total_ms = u64::from(frame_count) * u64::from(step_time_ms);
    // frame_count * 255 ms / 1000 always fits in u32
    ((2 * total_ms + 1000) / 2000) as u32
}
