// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size binary frame codec for peer pose broadcast.
//!
//! One frame carries one peer's identity and position:
//!
//! ```text
//! +-----------------------------+--------+--------+--------+
//! | bytes 0..200                | 200..  | 208..  | 216..  |
//! | name, UTF-8, space-padded   | x f64  | y f64  | z f64  |
//! +-----------------------------+--------+--------+--------+
//! ```
//!
//! All doubles are big-endian. A frame is always exactly
//! [`FRAME_LEN`](crate::config::FRAME_LEN) bytes; any other datagram
//! length is rejected on decode.

use crate::config::{FILL_BYTE, FRAME_LEN, NAME_LEN, X_OFFSET, Y_OFFSET, Z_OFFSET};

/// A point in the local tracking universe's coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Errors raised when decoding a received datagram.
///
/// Receive paths treat these as per-datagram: log, drop, continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Datagram length differs from the fixed frame length.
    Length { got: usize },
    /// Name region is not valid UTF-8 after trimming the padding.
    Encoding { valid_up_to: usize },
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Length { got } => {
                write!(f, "Invalid frame length: {} (expected {})", got, FRAME_LEN)
            }
            WireError::Encoding { valid_up_to } => {
                write!(f, "Invalid UTF-8 in name region after byte {}", valid_up_to)
            }
        }
    }
}

impl std::error::Error for WireError {}

/// Encode a peer name and position into a wire frame.
///
/// The name is truncated to at most [`NAME_LEN`] bytes on a `char`
/// boundary (a multi-byte code point is never split) and padded with the
/// fill byte. Never fails for finite doubles.
#[must_use]
pub fn encode_frame(name: &str, position: Position) -> [u8; FRAME_LEN] {
    let mut frame = [FILL_BYTE; FRAME_LEN];

    let name_bytes = truncate_on_char_boundary(name, NAME_LEN);
    frame[..name_bytes.len()].copy_from_slice(name_bytes);

    frame[X_OFFSET..X_OFFSET + 8].copy_from_slice(&position.x.to_be_bytes());
    frame[Y_OFFSET..Y_OFFSET + 8].copy_from_slice(&position.y.to_be_bytes());
    frame[Z_OFFSET..Z_OFFSET + 8].copy_from_slice(&position.z.to_be_bytes());

    frame
}

/// Decode a wire frame into a peer name and position.
///
/// # Errors
///
/// Returns `WireError::Length` unless `buf` is exactly [`FRAME_LEN`]
/// bytes, and `WireError::Encoding` if the trimmed name region is not
/// valid UTF-8.
pub fn decode_frame(buf: &[u8]) -> Result<(String, Position), WireError> {
    if buf.len() != FRAME_LEN {
        return Err(WireError::Length { got: buf.len() });
    }

    let name_region = &buf[..NAME_LEN];
    let trimmed_len = name_region
        .iter()
        .rposition(|&b| b != FILL_BYTE)
        .map_or(0, |last| last + 1);

    let name = std::str::from_utf8(&name_region[..trimmed_len])
        .map_err(|e| WireError::Encoding {
            valid_up_to: e.valid_up_to(),
        })?
        .to_owned();

    let position = Position {
        x: read_f64_be(buf, X_OFFSET),
        y: read_f64_be(buf, Y_OFFSET),
        z: read_f64_be(buf, Z_OFFSET),
    };

    Ok((name, position))
}

/// Longest prefix of `name` whose UTF-8 encoding fits in `budget` bytes.
fn truncate_on_char_boundary(name: &str, budget: usize) -> &[u8] {
    if name.len() <= budget {
        return name.as_bytes();
    }
    let mut end = budget;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].as_bytes()
}

/// Read a big-endian f64 at a fixed offset. Caller guarantees bounds.
fn read_f64_be(buf: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_be_bytes(bytes)
}
