// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Seams to the VR runtime and renderer.
//!
//! The sync loop never talks to a VR runtime directly. It goes through
//! [`TrackingRuntime`] for device enumeration and pose sampling, and
//! through [`PoseRenderer`] for drawing peer markers. Production code
//! implements these against the real runtime bindings; tests use mocks.

use crate::wire::Position;
use crate::{Error, Result};
use std::time::Duration;

/// Opaque slot of a tracked device inside the VR runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u32);

/// Device classes the loop asks for, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Head-mounted display.
    Hmd,
    /// Any generic tracker puck.
    GenericTracker,
}

/// A local tracked entity selected for broadcast.
///
/// Owns a runtime handle and no identity string; the wire name comes
/// from the session identity. Local devices never enter the peer
/// registry.
#[derive(Debug, Clone, Copy)]
pub struct LocalDevice {
    handle: DeviceHandle,
}

impl LocalDevice {
    #[must_use]
    pub fn new(handle: DeviceHandle) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }
}

/// Device enumeration and pose sampling, provided by the VR runtime.
///
/// Both operations degrade silently: `None` means "nothing this tick",
/// never an error the loop has to handle.
pub trait TrackingRuntime {
    /// Find a tracked device of the given class, if one is connected.
    fn enumerate_device(&mut self, class: DeviceClass) -> Option<DeviceHandle>;

    /// Sample the current pose of a device.
    fn sample_pose(&mut self, handle: DeviceHandle) -> Option<Position>;
}

/// Marker rendering for remote peers.
///
/// Called once per registry entry per tick. `local_headset` is the
/// current local headset pose, used for distance-based effects; `None`
/// until the local device is resolved.
pub trait PoseRenderer {
    fn render(&mut self, name: &str, position: Position, local_headset: Option<Position>);
}

/// Fixed-backoff retry policy for runtime acquisition.
///
/// The default matches the historical behavior of waiting for the VR
/// runtime: one second between attempts, retrying forever.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub backoff: Duration,
    /// `None` retries without bound.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Retry a fallible runtime connection until it succeeds or the policy
/// is exhausted.
///
/// Every failed attempt is reported through the log rather than
/// swallowed.
///
/// # Errors
///
/// Returns `Error::RuntimeUnavailable` once a bounded policy runs out
/// of attempts.
pub fn acquire_runtime<T, E, F>(mut connect: F, policy: RetryPolicy) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempts: u32 = 0;
    loop {
        match connect() {
            Ok(runtime) => {
                if attempts > 0 {
                    log::info!(
                        "[runtime] connected after {} failed attempt(s)",
                        attempts
                    );
                }
                return Ok(runtime);
            }
            Err(err) => {
                attempts = attempts.saturating_add(1);
                log::warn!("[runtime] connect attempt {} failed: {}", attempts, err);
                if let Some(max) = policy.max_attempts {
                    if attempts >= max {
                        return Err(Error::RuntimeUnavailable { attempts });
                    }
                }
                std::thread::sleep(policy.backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_one_second_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff, Duration::from_secs(1));
        assert!(policy.max_attempts.is_none());
    }

    #[test]
    fn test_acquire_succeeds_first_try() {
        let policy = RetryPolicy {
            backoff: Duration::from_millis(1),
            max_attempts: Some(1),
        };
        let result: Result<u32> = acquire_runtime(|| Ok::<_, std::io::Error>(7), policy);
        assert_eq!(result.expect("acquire should succeed"), 7);
    }

    #[test]
    fn test_acquire_succeeds_after_failures() {
        let policy = RetryPolicy {
            backoff: Duration::from_millis(1),
            max_attempts: Some(10),
        };
        let mut calls = 0;
        let result: Result<&str> = acquire_runtime(
            || {
                calls += 1;
                if calls < 3 {
                    Err("not ready")
                } else {
                    Ok("runtime")
                }
            },
            policy,
        );
        assert_eq!(result.expect("acquire should succeed"), "runtime");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_bounded_policy_exhausts() {
        let policy = RetryPolicy {
            backoff: Duration::from_millis(1),
            max_attempts: Some(3),
        };
        let result: Result<()> = acquire_runtime(|| Err::<(), _>("still down"), policy);
        match result {
            Err(Error::RuntimeUnavailable { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected RuntimeUnavailable, got {:?}", other),
        }
    }
}
