// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Playsync global configuration - single source of truth.
//!
//! This module centralizes the wire layout, port, and scheduling constants.
//! **NEVER hardcode elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (wire layout, port, rates)
//! - **Level 2 (Dynamic)**: [`SyncConfig`] for per-session overrides

use std::time::Duration;

// =======================================================================
// Wire Layout
// All multi-byte numeric fields are big-endian. Offsets are fixed.
// =======================================================================

/// Width of the peer name field on the wire (bytes `0..200` of a frame).
///
/// Names are UTF-8, right-padded with [`FILL_BYTE`] to this width.
pub const NAME_LEN: usize = 200;

/// Fill byte used to right-pad names to [`NAME_LEN`] (ASCII space).
pub const FILL_BYTE: u8 = 0x20;

/// Byte offset of the x coordinate (big-endian f64).
pub const X_OFFSET: usize = NAME_LEN;

/// Byte offset of the y coordinate (big-endian f64).
pub const Y_OFFSET: usize = NAME_LEN + 8;

/// Byte offset of the z coordinate (big-endian f64).
pub const Z_OFFSET: usize = NAME_LEN + 16;

/// Total frame length: name field plus three big-endian doubles.
///
/// A datagram of any other length is not a valid frame.
pub const FRAME_LEN: usize = NAME_LEN + 3 * 8;

// =======================================================================
// Transport
// =======================================================================

/// Well-known UDP broadcast port shared by every participant.
pub const BROADCAST_PORT: u16 = 45368;

/// Receive buffer size, sized to a full Ethernet MTU.
///
/// An oversized datagram arrives at its true length and fails the frame
/// length check instead of being silently truncated at the socket.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// Receive poll timeout.
///
/// Bounds how long the rx thread waits before re-checking its running
/// flag. Liveness only, not a correctness requirement.
pub const RX_POLL_TIMEOUT: Duration = Duration::from_millis(10);

// =======================================================================
// Scheduling
// =======================================================================

/// Default tick rate of the sync loop, matching the VR compositor refresh.
pub const DEFAULT_TICK_RATE_HZ: u32 = 90;

/// Runtime configuration for one sync session.
///
/// `Default` gives the well-known port, the default tick rate, and an
/// identity resolved from `{hostname}_{username}`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// UDP port used for both send and receive.
    pub port: u16,
    /// Tick rate of the sync loop in Hz (clamped to at least 1).
    pub tick_rate_hz: u32,
    /// Wire identity override. `None` resolves the host identity.
    pub identity: Option<String>,
}

impl SyncConfig {
    /// Duration of one tick at the configured rate.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            port: BROADCAST_PORT,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            identity: None,
        }
    }
}
