// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Playsync - shared-playspace peer pose synchronization
//!
//! Multiple VR runtime instances on one LAN share a physical playspace:
//! each participant broadcasts the position of its own headset at a
//! fixed rate over UDP and renders a marker for every peer it hears
//! from. Datagrams are unreliable and unordered; the peer registry
//! keeps only the latest position per peer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use playsync::{SyncConfig, SyncLoop};
//! use std::sync::atomic::AtomicBool;
//!
//! # struct MyRuntime;
//! # impl playsync::TrackingRuntime for MyRuntime {
//! #     fn enumerate_device(&mut self, _: playsync::DeviceClass) -> Option<playsync::DeviceHandle> { None }
//! #     fn sample_pose(&mut self, _: playsync::DeviceHandle) -> Option<playsync::Position> { None }
//! # }
//! # struct MyOverlay;
//! # impl playsync::PoseRenderer for MyOverlay {
//! #     fn render(&mut self, _: &str, _: playsync::Position, _: Option<playsync::Position>) {}
//! # }
//! fn main() -> playsync::Result<()> {
//!     let shutdown = AtomicBool::new(false);
//!     let mut sync = SyncLoop::new(SyncConfig::default(), MyRuntime, MyOverlay)?;
//!     sync.run(&shutdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                       SyncLoop (per tick)                    |
//! |  sample pose -> encode -> send        drain -> filter -> apply |
//! +--------------------------------------------------------------+
//! |  wire          |  transport                  |  registry     |
//! |  224-byte      |  UDP broadcast send socket  |  latest pose  |
//! |  frame codec   |  + background rx thread     |  per peer     |
//! +--------------------------------------------------------------+
//! ```
//!
//! The rx thread is the sole producer and the sync loop the sole
//! consumer of the inbound queue; no other state crosses the thread
//! boundary.

/// Global configuration (wire layout, port, rates, `SyncConfig`).
pub mod config;
/// Local participant identity (`{hostname}_{username}`).
pub mod identity;
/// Last-known-position table for remote peers.
pub mod registry;
/// VR runtime and renderer seams, plus the acquisition retry policy.
pub mod runtime;
/// Fixed-rate synchronization loop.
pub mod sync;
/// UDP broadcast transport with background receive thread.
pub mod transport;
/// Fixed-size binary frame codec.
pub mod wire;

pub use config::SyncConfig;
pub use registry::{self_filter, Device, PeerRegistry};
pub use runtime::{
    acquire_runtime, DeviceClass, DeviceHandle, LocalDevice, PoseRenderer, RetryPolicy,
    TrackingRuntime,
};
pub use sync::SyncLoop;
pub use transport::{BroadcastTransport, PeerUpdate, RxMetrics};
pub use wire::{decode_frame, encode_frame, Position, WireError};

/// Errors returned by playsync operations.
///
/// Per-datagram decode problems are [`wire::WireError`] and never reach
/// this level; the receive path drops the datagram and continues.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Startup (fatal, not retried)
    // ========================================================================
    /// Failed to configure or bind a socket.
    BindFailed(String),
    /// Failed to start the background receive thread.
    SpawnFailed(String),
    /// No usable `{hostname}_{username}` identity.
    InvalidIdentity(String),

    // ========================================================================
    // Transport
    // ========================================================================
    /// I/O error with underlying cause.
    IoError(std::io::Error),
    /// Broadcast send rejected by the kernel.
    SendFailed(String),

    // ========================================================================
    // Runtime acquisition
    // ========================================================================
    /// VR runtime still unavailable after the retry policy was
    /// exhausted.
    RuntimeUnavailable { attempts: u32 },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BindFailed(msg) => write!(f, "Bind failed: {}", msg),
            Error::SpawnFailed(msg) => write!(f, "Thread spawn failed: {}", msg),
            Error::InvalidIdentity(msg) => write!(f, "Invalid identity: {}", msg),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            Error::RuntimeUnavailable { attempts } => {
                write!(f, "VR runtime unavailable after {} attempt(s)", attempts)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

/// Playsync version string.
pub const VERSION: &str = "0.2.0";
